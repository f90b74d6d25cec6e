/// Entry point for the sliver CLI, an EVM bytecode witness-chunk analyzer.
///
/// This module parses command-line arguments and dispatches to subcommands for decoding,
/// chunking, function discovery, leaf encoding and batch analysis. It initializes logging and
/// handles the main execution flow.
mod commands;

use clap::Parser;
use commands::{Cmd, Command, load_config};
use std::path::PathBuf;

/// Command-line interface for sliver.
///
/// sliver partitions contract bytecode into witness chunks and discovers which chunks each
/// callable function needs.
#[derive(Parser)]
#[command(name = "sliver")]
#[command(about = "sliver: EVM bytecode witness-chunk analyzer")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Input bytecode as a hex string (0x...) or file path prefixed with @
    /// (for `batch`, the JSON-lines file)
    input: String,

    /// JSON file with analysis settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chunk size in bytes (overrides the config file)
    #[arg(long, global = true)]
    threshold: Option<usize>,

    /// Consolidation gap in bytes (overrides the config file)
    #[arg(long, global = true)]
    gap: Option<usize>,
}

/// Runs the sliver CLI with the provided arguments.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if let Some(gap) = cli.gap {
        config.gap = gap;
    }

    cli.command.execute(&cli.input, config).await
}
