use async_trait::async_trait;
use clap::Args;
use sliver_analysis::batch::{read_records, run_batch};
use sliver_core::AnalysisConfig;
use std::error::Error;
use std::path::Path;

/// Arguments for the `batch` subcommand.
#[derive(Args)]
pub(crate) struct BatchArgs {
    /// Maximum number of contracts analyzed at once
    #[arg(short, long, default_value_t = 4)]
    jobs: usize,
}

#[async_trait]
impl super::Command for BatchArgs {
    async fn execute(self, input: &str, config: AnalysisConfig) -> Result<(), Box<dyn Error>> {
        let path = input.strip_prefix('@').unwrap_or(input);
        let records = read_records(Path::new(path))?;
        tracing::info!("analyzing {} contracts with {} jobs", records.len(), self.jobs);

        let tally = run_batch(records, config, self.jobs).await?;
        println!("{}", serde_json::to_string_pretty(&tally)?);

        if !tally.internal_errors.is_empty() {
            return Err(format!(
                "{} contracts hit internal consistency errors",
                tally.internal_errors.len()
            )
            .into());
        }
        Ok(())
    }
}
