/// Module for the `decode` subcommand, which decodes EVM bytecode to annotated assembly.
///
/// This module prints the code length and Keccak-256 hash followed by one line per instruction
/// with its program counter, mnemonic and immediate.
use async_trait::async_trait;
use clap::Args;
use sliver_core::AnalysisConfig;
use sliver_core::decoder::decode_bytecode;
use std::error::Error;

/// Arguments for the `decode` subcommand.
#[derive(Args)]
pub(crate) struct DecodeArgs {}

/// Executes the `decode` subcommand to decode bytecode.
///
/// # Arguments
/// * `input` - A hex string (0x...) or file path (@...) containing EVM bytecode.
///
/// # Returns
/// A `Result` indicating success or an error if decoding fails.
#[async_trait]
impl super::Command for DecodeArgs {
    async fn execute(self, input: &str, _config: AnalysisConfig) -> Result<(), Box<dyn Error>> {
        let (instructions, info) = match input.strip_prefix('@') {
            Some(path) => decode_bytecode(path, true),
            None => decode_bytecode(input, false),
        }
        .map(|(instructions, info, _)| (instructions, info))?;

        println!("; {} bytes, keccak256 0x{}", info.byte_length, hex::encode(info.keccak_hash));
        for instr in instructions {
            println!("{instr}");
        }
        Ok(())
    }
}
