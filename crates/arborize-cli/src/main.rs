//! # arbz - Command Line Interface for declarative neuron models
//!
//! The command-line front end to the arborize model builder. Inspect
//! morphologies, check definitions against them, lower models to NEURON- or
//! Arbor-style templates, and browse the mechanism catalog.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod error;

use commands::ArborizeCli;
use error::CliResult;

#[tokio::main]
async fn main() -> CliResult<()> {
    // Initialize logging with environment variable support
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let cli = ArborizeCli::parse();

    if let Err(err) = cli.execute().await {
        error!("Command failed: {}", err);
        std::process::exit(1);
    }

    Ok(())
}
