//! Binary crate for the `city-weather` command-line tool.
//!
//! This crate focuses on:
//! - Installing the log subscriber
//! - Loading configuration and credentials
//! - Printing, saving and plotting the report

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
