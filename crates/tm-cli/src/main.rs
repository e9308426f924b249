use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, mpsc};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tm_cli::commands::{history, records, run, today, totals};
use tm_cli::units::DistanceFormat;
use tm_cli::{Cli, Commands, Config};
use tm_core::{Clock, SystemClock};
use tm_db::StatsRepository;

/// Load config and open the stats database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(StatsRepository, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let repo = StatsRepository::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((repo, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init so a second initialization (tests) is not fatal
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Run) => {
            let (repo, config) = open_database(cli.config.as_deref())?;
            let (stop_tx, stop_rx) = mpsc::channel();
            ctrlc::set_handler(move || {
                let _ = stop_tx.send(());
            })
            .context("failed to install Ctrl-C handler")?;
            run::run(
                &mut out,
                repo,
                &config,
                tm_tracker::default_source(),
                Arc::new(SystemClock),
                &stop_rx,
            )?;
        }
        Some(Commands::Today { json }) => {
            let (repo, config) = open_database(cli.config.as_deref())?;
            let distance = DistanceFormat::from_config(&config);
            today::run(&mut out, &repo, SystemClock.today(), &distance, *json)?;
        }
        Some(Commands::Totals { json }) => {
            let (repo, config) = open_database(cli.config.as_deref())?;
            let distance = DistanceFormat::from_config(&config);
            totals::run(&mut out, &repo, &distance, *json)?;
        }
        Some(Commands::History { days, json }) => {
            let (repo, config) = open_database(cli.config.as_deref())?;
            let distance = DistanceFormat::from_config(&config);
            history::run(&mut out, &repo, *days, &distance, *json)?;
        }
        Some(Commands::Records { json }) => {
            let (repo, config) = open_database(cli.config.as_deref())?;
            let distance = DistanceFormat::from_config(&config);
            records::run(&mut out, &repo, &distance, *json)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(out)?;
        }
    }

    out.flush()?;
    Ok(())
}
