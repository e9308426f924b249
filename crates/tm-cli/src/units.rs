//! Human-readable rendering of distances and durations.

use crate::config::{Config, DistanceUnit};

const METERS_PER_INCH: f64 = 0.0254;
const INCHES_PER_FOOT: f64 = 12.0;
const FEET_PER_MILE: f64 = 5280.0;

/// Renders pixel distances in the configured unit system.
///
/// Metric and imperial output need a screen DPI; without one distances stay
/// in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceFormat {
    unit: DistanceUnit,
    dpi: Option<f64>,
}

impl DistanceFormat {
    pub const fn new(unit: DistanceUnit, dpi: Option<f64>) -> Self {
        Self { unit, dpi }
    }

    /// Uses `dpi`, falling back to one derived from the screen width.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.distance_unit, config.effective_dpi())
    }

    pub fn format(&self, pixels: f64) -> String {
        let inches = match self.dpi {
            Some(dpi) if dpi > 0.0 => pixels / dpi,
            _ => return format_pixels(pixels),
        };

        match self.unit {
            DistanceUnit::Pixels => format_pixels(pixels),
            DistanceUnit::Metric => {
                let cm = inches * METERS_PER_INCH * 100.0;
                if cm >= 100_000.0 {
                    format!("{:.2} km", cm / 100_000.0)
                } else if cm >= 100.0 {
                    format!("{:.2} m", cm / 100.0)
                } else {
                    format!("{cm:.2} cm")
                }
            }
            DistanceUnit::Imperial => {
                let feet = inches / INCHES_PER_FOOT;
                if feet >= FEET_PER_MILE {
                    format!("{:.2} miles", feet / FEET_PER_MILE)
                } else if inches >= INCHES_PER_FOOT {
                    format!("{feet:.2} feet")
                } else {
                    format!("{inches:.2} inches")
                }
            }
        }
    }
}

fn format_pixels(pixels: f64) -> String {
    format!("{pixels:.0} pixels")
}

/// Formats seconds as `HH:MM:SS`. Negative values render as zero.
pub fn format_hms(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_without_dpi() {
        let format = DistanceFormat::new(DistanceUnit::Metric, None);
        assert_eq!(format.format(1234.6), "1235 pixels");

        let zero_dpi = DistanceFormat::new(DistanceUnit::Imperial, Some(0.0));
        assert_eq!(zero_dpi.format(10.0), "10 pixels");
    }

    #[test]
    fn metric_picks_largest_unit() {
        let format = DistanceFormat::new(DistanceUnit::Metric, Some(100.0));
        // 100 px at 100 dpi is one inch
        assert_eq!(format.format(100.0), "2.54 cm");
        assert_eq!(format.format(10_000.0), "2.54 m");
        assert_eq!(format.format(10_000_000.0), "2.54 km");
    }

    #[test]
    fn imperial_picks_largest_unit() {
        let format = DistanceFormat::new(DistanceUnit::Imperial, Some(96.0));
        assert_eq!(format.format(48.0), "0.50 inches");
        assert_eq!(format.format(96.0 * 18.0), "1.50 feet");
        assert_eq!(format.format(96.0 * 12.0 * 5280.0 * 2.0), "2.00 miles");
    }

    #[test]
    fn from_config_derives_dpi_from_screen_width() {
        let config = Config {
            distance_unit: DistanceUnit::Metric,
            screen_width_px: Some(1920),
            screen_width_cm: Some(50.8),
            ..Config::default()
        };
        let format = DistanceFormat::from_config(&config);
        // 9600 px at 96 dpi is 100 inches
        assert_eq!(format.format(9600.0), "2.54 m");
    }

    #[test]
    fn pixels_unit_ignores_dpi() {
        let format = DistanceFormat::new(DistanceUnit::Pixels, Some(96.0));
        assert_eq!(format.format(500.0), "500 pixels");
    }

    #[test]
    fn hms_formatting() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(59), "00:00:59");
        assert_eq!(format_hms(3661), "01:01:01");
        assert_eq!(format_hms(100 * 3600), "100:00:00");
        assert_eq!(format_hms(-5), "00:00:00");
    }
}
