//! Analysis configuration and settings

use serde::{Deserialize, Serialize};

/// Tunables for a single contract analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Chunk size in bytes for all three chunking strategies
    pub threshold: usize,

    /// Maximum distance between consecutive blocks merged into one consolidated run
    pub gap: usize,

    /// Number of top stack slots compared when deciding whether a segment entry was already
    /// explored
    pub stack_compare_window: usize,

    /// Distinct entry stacks explored per segment start before further entries are skipped
    pub max_states_per_segment: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold: 128,
            gap: 4,
            stack_compare_window: 10,
            max_states_per_segment: 64,
        }
    }
}

impl AnalysisConfig {
    /// Default configuration with a different chunk threshold.
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"threshold": 32}"#).unwrap();
        assert_eq!(config.threshold, 32);
        assert_eq!(config.gap, 4);
        assert_eq!(config.max_states_per_segment, 64);
    }
}
