//! nodeclaim CLI
//!
//! Provisions Karpenter NodeClaims for KAITO workspaces and waits for the
//! nodes to become ready.

use anyhow::Context;
use clap::Parser;

use nodeclaim_cli::Cli;
use nodeclaim_common::telemetry::{init_logging, LoggingConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        json: cli.global.log_json,
        ..Default::default()
    })
    .context("failed to initialize logging")?;

    cli.run().await?;
    Ok(())
}
