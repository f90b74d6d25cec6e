use crate::{TWO_FUNCTIONS, bytecode};
use sliver_analysis::{ContractRecord, collect_metrics, read_records, run_batch};
use sliver_core::{AnalysisConfig, analyze};
use sliver_utils::errors::FailureKind;
use std::io::Write;

fn record(address: &str, code: &[u8]) -> ContractRecord {
    ContractRecord {
        address: address.to_string(),
        code: format!("0x{}", hex::encode(code)),
    }
}

#[tokio::test]
async fn test_batch_tallies_every_outcome() {
    crate::init_tracing();
    let records = vec![
        record("0x03", &bytecode(TWO_FUNCTIONS)),
        record("0x01", &bytecode("PUSH1 0x01 PUSH1 0x00 SSTORE STOP")),
        record("0x02", &bytecode("CALLVALUE JUMP")),
        record("0x04", &bytecode("PUSH1 0x80 PUSH1 0x40 MSTORE STOP")),
        ContractRecord {
            address: "0x05".into(),
            code: "0xnothex".into(),
        },
    ];

    let tally = run_batch(records, AnalysisConfig::default(), 2).await.unwrap();
    tracing::debug!("tally: {:?}", tally);

    assert_eq!(tally.total, 5);
    assert_eq!(tally.success_count(), 2);
    assert_eq!(tally.successes[0].address, "0x01");
    assert_eq!(tally.successes[1].address, "0x03");
    assert_eq!(tally.successes[1].metrics.function_count, 2);
    assert_eq!(tally.failures[&FailureKind::DynamicJump], 1);
    assert_eq!(tally.failures[&FailureKind::SelectorBlockNotFound], 1);
    assert_eq!(tally.invalid_inputs, 1);
    assert!(tally.internal_errors.is_empty());
}

#[tokio::test]
async fn test_batch_from_jsonl_file() {
    let code = bytecode(TWO_FUNCTIONS);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for address in ["0xb", "0xa"] {
        let line = serde_json::to_string(&record(address, &code)).unwrap();
        writeln!(file, "{line}").unwrap();
    }

    let records = read_records(file.path()).unwrap();
    let tally = run_batch(records, AnalysisConfig::default(), 1).await.unwrap();
    assert_eq!(tally.success_count(), 2);
    assert_eq!(tally.successes[0].address, "0xa");

    // Same code, same metrics, regardless of scheduling
    let expected = collect_metrics(&analyze(&code, &AnalysisConfig::default()).unwrap());
    assert!(tally.successes.iter().all(|s| s.metrics == expected));
    assert!((tally.mean_witness_bytes() - 42.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_batch_output_is_serializable() {
    let records = vec![record("0x01", &bytecode("ADD"))];
    let tally = run_batch(records, AnalysisConfig::default(), 4).await.unwrap();
    let json = serde_json::to_value(&tally).unwrap();
    assert_eq!(json["failures"]["StackUnderflow"], 1);
    assert_eq!(json["total"], 1);
}
