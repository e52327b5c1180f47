//! Binary crate for the `clima` services.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Binding listeners and serving the core routers
//! - Telemetry setup (logging, span export, trace propagation)

use clap::Parser;

mod cli;
mod telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
