use async_trait::async_trait;
use clap::{Args, ValueEnum};
use sliver_core::AnalysisConfig;
use sliver_core::chunking::{Strategy, chunk};
use sliver_core::detection::valid_jump_destinations;
use std::error::Error;

/// Chunking strategy selectable on the command line.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum StrategyArg {
    Fixed,
    Jumpdest,
    Strict,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Fixed => Self::Fixed,
            StrategyArg::Jumpdest => Self::Jumpdest,
            StrategyArg::Strict => Self::Strict,
        }
    }
}

/// Arguments for the `chunks` subcommand.
#[derive(Args)]
pub(crate) struct ChunksArgs {
    /// Boundary rule used to cut the code
    #[arg(short, long, value_enum, default_value = "fixed")]
    strategy: StrategyArg,
}

#[async_trait]
impl super::Command for ChunksArgs {
    async fn execute(self, input: &str, config: AnalysisConfig) -> Result<(), Box<dyn Error>> {
        let code = super::read_input(input)?;
        let jumps = valid_jump_destinations(&code, code.len());
        let strategy = Strategy::from(self.strategy);
        let chunks = chunk(&code, strategy, config.threshold, &jumps)?;

        println!(
            "; {} chunks, strategy {}, threshold {}",
            chunks.len(),
            strategy,
            config.threshold
        );
        for c in &chunks {
            match c.offset {
                Some(offset) => println!("{:06x}  {:>5}  +{}", c.start, c.length, offset),
                None => println!("{:06x}  {:>5}", c.start, c.length),
            }
        }
        Ok(())
    }
}
