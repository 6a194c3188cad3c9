//! ## flowsentry-cli
//! **Unified operational interface**
//! Flowsentry main entrypoint with live (pcap-based) capture, offline
//! replay, and anomaly-baseline training modes.

use clap::Parser;
use flowsentry_telemetry::logging::EventLogger;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    EventLogger::init();
    let cli = Cli::parse();
    commands::run_command(cli).await
}
