use super::selector_hex;
use async_trait::async_trait;
use clap::Args;
use sliver_analysis::metrics::collect_metrics;
use sliver_core::cfg_ir::BlockMap;
use sliver_core::witness::{FunctionWitness, WitnessMode};
use sliver_core::{AnalysisConfig, analyze};
use std::error::Error;

/// Arguments for the `functions` subcommand.
#[derive(Args)]
pub(crate) struct FunctionsArgs {
    /// Print summary metrics as JSON instead of the per-function listing
    #[arg(long)]
    json: bool,

    /// Also list every reachable block before consolidation
    #[arg(long)]
    blocks: bool,
}

#[async_trait]
impl super::Command for FunctionsArgs {
    async fn execute(self, input: &str, config: AnalysisConfig) -> Result<(), Box<dyn Error>> {
        let code = super::read_input(input)?;
        let report = analyze(&code, &config)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&collect_metrics(&report))?);
            return Ok(());
        }

        println!(
            "; code {} bytes, code end {}, {} reachable, {} unreached ranges",
            report.code_len,
            report.code_end,
            report.coverage.covered,
            report.coverage.unreached.len()
        );
        match &report.mode {
            WitnessMode::PerFunction(functions) => {
                for (selector, witness) in functions {
                    println!(
                        "{}  dispatch {:#06x}  entry {:#06x}  {} bytes",
                        selector_hex(*selector),
                        witness.dispatch_pc,
                        witness.entry_pc,
                        witness.witness_bytes()
                    );
                    self.print_witness(witness);
                }
            }
            WitnessMode::WholeContract(witness) => {
                println!("whole contract  {} bytes", witness.witness_bytes());
                self.print_witness(witness);
            }
        }
        Ok(())
    }
}

impl FunctionsArgs {
    fn print_witness(&self, witness: &FunctionWitness) {
        if self.blocks {
            print_ranges("block", &witness.blocks);
        }
        print_ranges("run", &witness.runs);
    }
}

fn print_ranges(label: &str, ranges: &BlockMap) {
    for (start, length) in ranges {
        println!("    {label} {start:06x} +{length}");
    }
}
