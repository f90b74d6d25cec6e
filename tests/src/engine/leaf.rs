use crate::{TWO_FUNCTIONS, bytecode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sliver_core::cfg_ir::BlockMap;
use sliver_core::leaf::{decode_leaf, encode_leaf};
use sliver_core::witness::WitnessMode;
use sliver_core::{AnalysisConfig, analyze};

#[test]
fn test_function_leaves_carry_their_runs() {
    let code = bytecode(TWO_FUNCTIONS);
    let report = analyze(&code, &AnalysisConfig::default()).unwrap();
    let WitnessMode::PerFunction(functions) = &report.mode else {
        panic!("expected per-function mode");
    };

    for (selector, witness) in functions {
        let blocks = decode_leaf(&witness.leaf).unwrap();
        assert_eq!(blocks.len(), witness.runs.len(), "{selector:#010x}");
        for (block, (&start, &length)) in blocks.iter().zip(&witness.runs) {
            assert_eq!((block.start, block.length), (start, length));
            assert_eq!(block.bytes, code[start..start + length]);
        }
        assert_eq!(
            witness.leaf.len(),
            2 + 4 * witness.runs.len() + witness.witness_bytes()
        );
    }
}

#[test]
fn test_random_disjoint_blocks_survive_encoding() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut code = vec![0u8; 4096];
    rng.fill(&mut code[..]);

    for _ in 0..50 {
        let mut blocks = BlockMap::new();
        let mut pc = 0;
        while pc < code.len() {
            pc += rng.random_range(0..64);
            let length = rng.random_range(1..128).min(code.len().saturating_sub(pc));
            if length == 0 {
                break;
            }
            blocks.insert(pc, length);
            pc += length;
        }

        let leaf = encode_leaf(&blocks, &code).unwrap();
        let decoded = decode_leaf(&leaf).unwrap();
        let recovered: BlockMap = decoded.iter().map(|b| (b.start, b.length)).collect();
        assert_eq!(recovered, blocks);
        assert!(decoded.iter().all(|b| b.bytes == code[b.start..b.start + b.length]));
    }
}
