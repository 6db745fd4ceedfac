//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `websteps_helper` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use websteps_helper::initialization::{init_crypto_provider, init_logger_with};
use websteps_helper::{run_helper, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Settings may come from a .env file next to the working directory
    let _ = dotenvy::dotenv();

    let config = Config::parse();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    init_crypto_provider();

    match run_helper(config).await {
        Ok(report) => {
            log::info!(
                "Served {} request{} in {:.1}s",
                report.requests,
                if report.requests == 1 { "" } else { "s" },
                report.elapsed_seconds
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("websteps-helper error: {:#}", e);
            process::exit(1);
        }
    }
}
