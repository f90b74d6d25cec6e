/// Module for computing summary metrics of a witness analysis.
///
/// Metrics condense a [`WitnessReport`] into the numbers a batch run aggregates: code size, how
/// much of the executable code is reachable, how many functions were attributed, how large the
/// per-function witnesses are, and how many chunks each strategy produces.
///
/// # Usage
/// ```rust,ignore
/// let report = sliver_core::analyze(&code, &AnalysisConfig::default())?;
/// let metrics = metrics::collect_metrics(&report);
/// println!("{}", serde_json::to_string_pretty(&metrics)?);
/// ```
use serde::{Deserialize, Serialize};
use sliver_core::witness::{FunctionWitness, WitnessMode, WitnessReport};

/// Summary numbers for one analyzed contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Length of the runtime bytecode in bytes.
    pub code_len: usize,
    /// Exclusive end of executable code.
    pub code_end: usize,
    /// Bytes below `code_end` covered by reachable segments.
    pub reachable_bytes: usize,
    /// Number of attributed functions (0 in whole-contract mode).
    pub function_count: usize,
    /// Mean consolidated witness size over all functions (or the whole-contract witness).
    pub mean_witness_bytes: f64,
    /// Largest consolidated witness.
    pub max_witness_bytes: usize,
    /// Total encoded leaf size.
    pub leaf_bytes: usize,
    /// Chunk count of the fixed-size strategy.
    pub fixed_chunks: usize,
    /// Chunk count of the jump-destination aligned strategy.
    pub jumpdest_chunks: usize,
    /// Chunk count of the strict fixed-size strategy.
    pub strict_chunks: usize,
}

/// Collects metrics from a witness report.
///
/// # Arguments
/// * `report` - The output of [`sliver_core::analyze`].
///
/// # Returns
/// A `Metrics` struct summarizing the report.
pub fn collect_metrics(report: &WitnessReport) -> Metrics {
    let witnesses: Vec<&FunctionWitness> = match &report.mode {
        WitnessMode::PerFunction(functions) => functions.values().collect(),
        WitnessMode::WholeContract(witness) => vec![witness],
    };

    let sizes: Vec<usize> = witnesses.iter().map(|w| w.witness_bytes()).collect();
    let mean_witness_bytes = if sizes.is_empty() {
        0.0
    } else {
        sizes.iter().sum::<usize>() as f64 / sizes.len() as f64
    };

    Metrics {
        code_len: report.code_len,
        code_end: report.code_end,
        reachable_bytes: report.coverage.covered,
        function_count: report.function_count(),
        mean_witness_bytes,
        max_witness_bytes: sizes.iter().copied().max().unwrap_or(0),
        leaf_bytes: witnesses.iter().map(|w| w.leaf.len()).sum(),
        fixed_chunks: report.chunks.fixed.len(),
        jumpdest_chunks: report.chunks.jumpdest.len(),
        strict_chunks: report.chunks.strict.len(),
    }
}

/// Ratio of witness bytes to code bytes, the headline number for witness savings.
pub fn witness_ratio(metrics: &Metrics) -> f64 {
    if metrics.code_len == 0 {
        0.0
    } else {
        metrics.mean_witness_bytes / metrics.code_len as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sliver_core::AnalysisConfig;

    #[test]
    fn whole_contract_metrics() {
        // PUSH1 0x01 PUSH1 0x00 SSTORE STOP
        let code = [0x60, 0x01, 0x60, 0x00, 0x55, 0x00];
        let report = sliver_core::analyze(&code, &AnalysisConfig::default()).unwrap();
        let metrics = collect_metrics(&report);
        assert_eq!(metrics.code_len, 6);
        assert_eq!(metrics.function_count, 0);
        assert_eq!(metrics.max_witness_bytes, 6);
        assert_eq!(metrics.reachable_bytes, 6);
        // count + one (start, length) header + 6 bytes
        assert_eq!(metrics.leaf_bytes, 12);
        assert!((witness_ratio(&metrics) - 1.0).abs() < f64::EPSILON);
    }
}
