//! Batch driver: analyzes many contracts in parallel and tallies the outcomes.

use crate::metrics::{Metrics, collect_metrics};
use serde::{Deserialize, Serialize};
use sliver_core::AnalysisConfig;
use sliver_core::decoder::input_to_bytes;
use sliver_utils::errors::{AnalysisError, BatchError, FailureKind};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One input contract, as read from a JSON-lines file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Account address, used only as a label.
    pub address: String,
    /// Runtime bytecode as a hex string.
    pub code: String,
}

/// Metrics of a successfully analyzed contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractMetrics {
    /// Account address of the record.
    pub address: String,
    /// Summary of its witness report.
    pub metrics: Metrics,
}

/// An engine invariant violation, kept apart from ordinary failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalFailure {
    /// Account address of the record.
    pub address: String,
    /// Rendered error message.
    pub message: String,
}

/// Aggregated outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchTally {
    /// Records processed.
    pub total: usize,
    /// Per-contract metrics of successful analyses, ordered by address.
    pub successes: Vec<ContractMetrics>,
    /// Ordinary analysis failures by kind.
    pub failures: BTreeMap<FailureKind, usize>,
    /// Records whose code was not valid hex.
    pub invalid_inputs: usize,
    /// Internal consistency violations. These indicate engine bugs.
    pub internal_errors: Vec<InternalFailure>,
}

impl BatchTally {
    /// Number of successful analyses.
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of ordinary failures across all kinds.
    pub fn failure_count(&self) -> usize {
        self.failures.values().sum()
    }

    /// Mean of the per-contract mean witness sizes.
    pub fn mean_witness_bytes(&self) -> f64 {
        if self.successes.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .successes
            .iter()
            .map(|s| s.metrics.mean_witness_bytes)
            .sum();
        sum / self.successes.len() as f64
    }

    fn record(&mut self, address: String, outcome: Result<Metrics, AnalysisError>) {
        self.total += 1;
        match outcome {
            Ok(metrics) => self.successes.push(ContractMetrics { address, metrics }),
            Err(e) if e.is_internal() => {
                tracing::error!("internal consistency violation in {}: {}", address, e);
                self.internal_errors.push(InternalFailure {
                    address,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                tracing::debug!("{} failed: {}", address, e);
                *self.failures.entry(e.kind()).or_default() += 1;
            }
        }
    }
}

/// Reads JSON-lines contract records, skipping blank lines.
pub fn read_records(path: &Path) -> Result<Vec<ContractRecord>, BatchError> {
    let text = std::fs::read_to_string(path).map_err(|source| BatchError::Read {
        path: path.display().to_string(),
        source,
    })?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| BatchError::Record {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Analyzes `records` on the blocking pool with at most `jobs` analyses in flight.
///
/// A failing contract never stops the batch. The returned tally lists successes by address so
/// the output does not depend on scheduling.
pub async fn run_batch(
    records: Vec<ContractRecord>,
    config: AnalysisConfig,
    jobs: usize,
) -> Result<BatchTally, BatchError> {
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let config = Arc::new(config);
    let mut in_flight = JoinSet::new();
    let mut tally = BatchTally::default();

    for record in records {
        let code = match input_to_bytes(&record.code, false) {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!("skipping {}: {}", record.address, e);
                tally.total += 1;
                tally.invalid_inputs += 1;
                continue;
            }
        };

        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| BatchError::Task(e.to_string()))?;
        let config = Arc::clone(&config);
        in_flight.spawn_blocking(move || {
            let _permit = permit;
            let outcome = sliver_core::analyze(&code, &config).map(|report| collect_metrics(&report));
            (record.address, outcome)
        });
    }

    while let Some(joined) = in_flight.join_next().await {
        let (address, outcome) = joined.map_err(|e| BatchError::Task(e.to_string()))?;
        tally.record(address, outcome);
    }

    tally.successes.sort_by(|a, b| a.address.cmp(&b.address));
    tally.internal_errors.sort_by(|a, b| a.address.cmp(&b.address));
    tracing::info!(
        "batch done: {} contracts, {} ok, {} failed, {} internal",
        tally.total,
        tally.success_count(),
        tally.failure_count(),
        tally.internal_errors.len()
    );
    Ok(tally)
}
