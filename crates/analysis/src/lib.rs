//! Per-contract metrics and the batch driver that tallies analysis outcomes.

pub mod batch;
pub mod metrics;

pub use batch::{BatchTally, ContractRecord, read_records, run_batch};
pub use metrics::{Metrics, collect_metrics};
