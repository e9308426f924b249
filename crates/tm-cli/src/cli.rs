//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Pointer activity tracker.
///
/// Counts pointer distance, clicks and active time per day, and reports on
/// the history it has collected.
#[derive(Debug, Parser)]
#[command(name = "tm", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track pointer activity until interrupted.
    Run,

    /// Show today's counters.
    Today {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show totals across every tracked day.
    Totals {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the most recent days, newest first.
    History {
        /// Number of days to show.
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the record day for distance and for active time.
    Records {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn history_defaults_to_a_week() {
        let cli = Cli::parse_from(["tm", "history"]);
        assert!(matches!(
            cli.command,
            Some(Commands::History {
                days: 7,
                json: false
            })
        ));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["tm", "today", "--json", "-v", "--config", "/tmp/tm.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/tm.toml")));
        assert!(matches!(cli.command, Some(Commands::Today { json: true })));
    }
}
