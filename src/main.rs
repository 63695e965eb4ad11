//! schemaviz entry point.

use std::{process, str::FromStr};

use clap::Parser;
use log::{debug, error, info, LevelFilter};

use schemaviz::cli::{self, Cli};

fn main() {
    let cli = Cli::parse();

    // Initialize the logger with the specified log level
    let log_level = LevelFilter::from_str(&cli.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", cli.log_level);
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting schemaviz");
    debug!(cli:?; "Parsed arguments");

    if let Err(err) = cli::run(&cli) {
        error!("{:#}", err);
        process::exit(1);
    }

    info!("Completed successfully");
}
