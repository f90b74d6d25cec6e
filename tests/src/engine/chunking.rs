use crate::{TWO_FUNCTIONS, bytecode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sliver_core::chunking::{Chunk, Strategy, chunk};
use sliver_core::detection::valid_jump_destinations;
use sliver_core::{AnalysisConfig, analyze};

const STRATEGIES: [Strategy; 3] = [Strategy::Fixed, Strategy::Jumpdest, Strategy::Strict];

fn assert_tiles(chunks: &[Chunk], len: usize, what: &str) {
    let mut next = 0;
    for c in chunks {
        assert_eq!(c.start, next, "{what}: gap or overlap at {}", c.start);
        assert!(c.length > 0, "{what}: empty chunk at {}", c.start);
        next = c.end();
    }
    assert_eq!(next, len, "{what}: chunks do not reach the end");
}

#[test]
fn test_random_code_is_tiled_by_every_strategy() {
    crate::init_tracing();
    let mut rng = StdRng::seed_from_u64(0x511e);
    for round in 0..200 {
        let len = rng.random_range(0..600);
        let mut code = vec![0u8; len];
        rng.fill(&mut code[..]);
        let threshold = rng.random_range(33..160);
        let jumps = valid_jump_destinations(&code, code.len());

        for strategy in STRATEGIES {
            let chunks = chunk(&code, strategy, threshold, &jumps).unwrap();
            let what = format!("round {round}, {strategy}, threshold {threshold}");
            assert_tiles(&chunks, code.len(), &what);

            match strategy {
                Strategy::Fixed => {
                    assert!(chunks.iter().all(|c| c.length <= threshold), "{what}");
                    assert!(chunks.iter().all(|c| c.offset.is_none()), "{what}");
                }
                Strategy::Strict => {
                    assert!(chunks.iter().all(|c| c.length <= threshold), "{what}");
                    assert!(
                        chunks
                            .iter()
                            .all(|c| c.offset.is_some_and(|o| usize::from(o) <= c.length)),
                        "{what}"
                    );
                }
                Strategy::Jumpdest => {}
            }
        }
    }
}

#[test]
fn test_empty_code_has_no_chunks() {
    let jumps = valid_jump_destinations(&[], 0);
    for strategy in STRATEGIES {
        assert!(chunk(&[], strategy, 32, &jumps).unwrap().is_empty());
    }
}

#[test]
fn test_single_byte_instructions_cut_evenly() {
    let code = vec![0x5b; 300];
    let jumps = valid_jump_destinations(&code, code.len());
    for strategy in STRATEGIES {
        let chunks = chunk(&code, strategy, 128, &jumps).unwrap();
        let starts: Vec<usize> = chunks.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0, 128, 256], "{strategy}");
    }
}

#[test]
fn test_report_carries_all_strategies() {
    let code = bytecode(TWO_FUNCTIONS);
    let report = analyze(&code, &AnalysisConfig::with_threshold(16)).unwrap();
    for strategy in STRATEGIES {
        assert_tiles(report.chunks.get(strategy), code.len(), &strategy.to_string());
    }
    // The metadata after the sentinel is cut on its own
    assert!(report.chunks.fixed.iter().any(|c| c.start == 61));
}
