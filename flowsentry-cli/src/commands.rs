use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::info;

use flowsentry_config::{ConfigError, FlowsentryConfig};
use flowsentry_engine::{run_live_mode, run_replay_mode, run_training_mode};

#[derive(Parser)]
#[command(name = "flowsentry", version, about)]
pub struct Cli {
    /// Path to a YAML configuration file; defaults to
    /// `config/flowsentry.yaml` when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Live capture and detection on a network interface
    Run(RunArgs),
    /// Replay a pcap capture file through the full pipeline
    Replay(ReplayArgs),
    /// Fit the anomaly baseline from a pcap capture file
    Train(TrainArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Interface to capture on; overrides the configured one.
    #[arg(short, long)]
    pub interface: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Capture file to replay.
    #[arg(short, long)]
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Capture file holding baseline traffic.
    #[arg(short, long)]
    pub file: PathBuf,
    /// Maximum number of flow snapshots to collect.
    #[arg(long)]
    pub samples: Option<usize>,
}

pub async fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            if let Some(interface) = args.interface {
                config.capture.interface = interface;
            }
            run_live_mode(config).await?;
        }
        Commands::Replay(args) => {
            let packets = run_replay_mode(config, &args.file).await?;
            info!(packets, "replay finished");
        }
        Commands::Train(args) => {
            let report = run_training_mode(config, &args.file, args.samples).await?;
            info!(
                samples = report.samples,
                calibrated_threshold = ?report.calibrated_threshold,
                score_min = report.score_min,
                score_mean = report.score_mean,
                score_max = report.score_max,
                "baseline trained"
            );
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FlowsentryConfig, ConfigError> {
    match path {
        Some(path) => FlowsentryConfig::load_from_path(path),
        None => FlowsentryConfig::load(),
    }
}
