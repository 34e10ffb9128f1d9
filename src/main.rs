//! # Pet Care CLI
//!
//! Runs one backend operation per invocation. Configuration comes from the
//! environment, see [`pet_care::config::AppConfig`].

pub mod action;

use clap::Parser;
use pet_care::{config::AppConfig, logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = action::AppArgs::parse();
    let config = AppConfig::from_env()?;

    // Export to logfire when a token is configured, console logging otherwise
    let shutdown_handler = match &config.logfire_token {
        Some(token) => Some(logger::setup_logfire(token)?),
        None => {
            logger::setup_simple_logger(config.log_level_filter())?;
            None
        }
    };

    let result = args.run(&config).await;

    if let Some(shutdown_handler) = shutdown_handler {
        shutdown_handler.shutdown()?;
    }

    result
}
