use async_trait::async_trait;
use clap::Subcommand;
use sliver_core::AnalysisConfig;
use sliver_core::decoder::input_to_bytes;
use sliver_utils::errors::DecodeError;
use std::error::Error;
use std::path::Path;

pub(crate) mod batch;
pub(crate) mod chunks;
pub(crate) mod decode;
pub(crate) mod functions;
pub(crate) mod leaf;

#[derive(Subcommand)]
pub(crate) enum Cmd {
    /// Decode bytecode to annotated assembly
    Decode(decode::DecodeArgs),

    /// Split bytecode into chunks with one strategy
    Chunks(chunks::ChunksArgs),

    /// Discover functions and their consolidated witness blocks
    Functions(functions::FunctionsArgs),

    /// Print the encoded witness leaf of each function
    Leaf(leaf::LeafArgs),

    /// Analyze a JSON-lines file of contracts and print the tally
    Batch(batch::BatchArgs),
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, input: &str, config: AnalysisConfig) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self, input: &str, config: AnalysisConfig) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Decode(args) => args.execute(input, config).await,
            Cmd::Chunks(args) => args.execute(input, config).await,
            Cmd::Functions(args) => args.execute(input, config).await,
            Cmd::Leaf(args) => args.execute(input, config).await,
            Cmd::Batch(args) => args.execute(input, config).await,
        }
    }
}

/// Reads bytecode from a hex string, or from a file when prefixed with `@`.
pub(crate) fn read_input(input: &str) -> Result<Vec<u8>, DecodeError> {
    match input.strip_prefix('@') {
        Some(path) => input_to_bytes(path, true),
        None => input_to_bytes(input, false),
    }
}

/// Loads the analysis configuration, falling back to defaults without a file.
pub(crate) fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let text = std::fs::read_to_string(path)?;
    let config: AnalysisConfig = serde_json::from_str(&text)?;
    tracing::debug!("loaded config from {}: {:?}", path.display(), config);
    Ok(config)
}

/// Formats a selector the way the dispatch block compares it.
pub(crate) fn selector_hex(selector: u32) -> String {
    format!("0x{selector:08x}")
}
