//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

const CM_PER_INCH: f64 = 2.54;

/// Unit system distances are reported in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Pixels,
    Metric,
    Imperial,
}

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Publish pointer movement.
    pub track_distance: bool,
    /// Publish button presses.
    pub track_clicks: bool,
    /// Seconds without pointer activity before a tick counts as inactive.
    pub inactivity_threshold_secs: u64,
    pub tick_interval_secs: u64,
    /// Seconds between periodic flushes; 0 flushes only on day change and exit.
    pub flush_interval_secs: u64,
    /// Overrides the first launch timestamp recorded on a fresh database.
    pub first_launch_date: Option<String>,
    /// Screen DPI, needed for metric and imperial distances.
    pub dpi: Option<f64>,
    /// Screen width in pixels; with `screen_width_cm`, derives DPI when `dpi` is unset.
    pub screen_width_px: Option<u32>,
    /// Physical screen width in centimeters.
    pub screen_width_cm: Option<f64>,
    pub distance_unit: DistanceUnit,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("track_distance", &self.track_distance)
            .field("track_clicks", &self.track_clicks)
            .field("inactivity_threshold_secs", &self.inactivity_threshold_secs)
            .field("tick_interval_secs", &self.tick_interval_secs)
            .field("flush_interval_secs", &self.flush_interval_secs)
            .field("distance_unit", &self.distance_unit)
            .field("dpi", &self.dpi)
            .field("screen_width_px", &self.screen_width_px)
            .field("screen_width_cm", &self.screen_width_cm)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("stats.db"),
            track_distance: true,
            track_clicks: true,
            inactivity_threshold_secs: 2,
            tick_interval_secs: 1,
            flush_interval_secs: 60,
            first_launch_date: None,
            dpi: None,
            screen_width_px: None,
            screen_width_cm: None,
            distance_unit: DistanceUnit::Pixels,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, the user config file, `config_path`,
    /// then `TM_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("TM_"));

        figment.extract()
    }

    /// The configured DPI, or one derived from the physical screen width.
    pub fn effective_dpi(&self) -> Option<f64> {
        if self.dpi.is_some() {
            return self.dpi;
        }
        match (self.screen_width_px, self.screen_width_cm) {
            (Some(px), Some(cm)) if px > 0 && cm > 0.0 => Some(f64::from(px) / (cm / CM_PER_INCH)),
            _ => None,
        }
    }

    /// Ticks between periodic flushes; 0 disables them.
    ///
    /// Any positive flush interval yields at least one tick, rounding up.
    pub fn flush_interval_ticks(&self) -> u32 {
        if self.tick_interval_secs == 0 || self.flush_interval_secs == 0 {
            return 0;
        }
        let ticks = self.flush_interval_secs.div_ceil(self.tick_interval_secs);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}

/// Returns the platform-specific config directory for tm.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("trackmymouse"))
}

/// Returns the platform-specific data directory for tm.
///
/// On Linux: `~/.local/share/trackmymouse`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("trackmymouse"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn test_dirs_data_path_ends_with_app_name() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "trackmymouse");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("stats.db"));
        assert_eq!(config.tick_interval_secs, 1);
        assert_eq!(config.inactivity_threshold_secs, 2);
        assert_eq!(config.distance_unit, DistanceUnit::Pixels);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_path = "/tmp/tm-test/stats.db"
track_clicks = false
dpi = 96.0
distance_unit = "metric"
first_launch_date = "2023-04-05T06:07:08"
"#
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/tm-test/stats.db"));
        assert!(config.track_distance);
        assert!(!config.track_clicks);
        assert_eq!(config.dpi, Some(96.0));
        assert_eq!(config.distance_unit, DistanceUnit::Metric);
        assert_eq!(
            config.first_launch_date.as_deref(),
            Some("2023-04-05T06:07:08")
        );
    }

    #[test]
    fn test_unknown_distance_unit_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"distance_unit = "furlongs""#).unwrap();
        assert!(Config::load_from(Some(file.path())).is_err());
    }

    #[test]
    fn test_effective_dpi_from_screen_width() {
        let mut config = Config {
            screen_width_px: Some(1920),
            screen_width_cm: Some(50.8),
            ..Config::default()
        };
        // 50.8 cm is 20 inches
        assert!((config.effective_dpi().unwrap() - 96.0).abs() < 1e-9);

        config.dpi = Some(110.0);
        assert_eq!(config.effective_dpi(), Some(110.0));

        config.dpi = None;
        config.screen_width_cm = Some(0.0);
        assert_eq!(config.effective_dpi(), None);
        assert_eq!(Config::default().effective_dpi(), None);
    }

    #[test]
    fn test_flush_interval_ticks() {
        let mut config = Config::default();
        assert_eq!(config.flush_interval_ticks(), 60);

        config.tick_interval_secs = 5;
        config.flush_interval_secs = 12;
        assert_eq!(config.flush_interval_ticks(), 3);

        config.flush_interval_secs = 10;
        assert_eq!(config.flush_interval_ticks(), 2);

        // shorter than one tick still flushes every tick
        config.flush_interval_secs = 1;
        assert_eq!(config.flush_interval_ticks(), 1);

        config.flush_interval_secs = 0;
        assert_eq!(config.flush_interval_ticks(), 0);
    }
}
