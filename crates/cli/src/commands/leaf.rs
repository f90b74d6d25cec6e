use super::selector_hex;
use async_trait::async_trait;
use clap::Args;
use sliver_core::witness::WitnessMode;
use sliver_core::{AnalysisConfig, analyze};
use std::error::Error;

/// Arguments for the `leaf` subcommand.
#[derive(Args)]
pub(crate) struct LeafArgs {
    /// Only print the leaf of this selector (hex, e.g. 0xa9059cbb)
    #[arg(long)]
    selector: Option<String>,
}

#[async_trait]
impl super::Command for LeafArgs {
    async fn execute(self, input: &str, config: AnalysisConfig) -> Result<(), Box<dyn Error>> {
        let code = super::read_input(input)?;
        let wanted = self
            .selector
            .as_deref()
            .map(|s| u32::from_str_radix(s.trim_start_matches("0x"), 16))
            .transpose()?;
        let report = analyze(&code, &config)?;

        match &report.mode {
            WitnessMode::PerFunction(functions) => {
                for (selector, witness) in functions {
                    if wanted.is_some_and(|w| w != *selector) {
                        continue;
                    }
                    println!("{} 0x{}", selector_hex(*selector), hex::encode(&witness.leaf));
                }
            }
            WitnessMode::WholeContract(witness) => {
                println!("contract 0x{}", hex::encode(&witness.leaf));
            }
        }
        Ok(())
    }
}
