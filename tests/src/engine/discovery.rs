use crate::{TWO_FUNCTIONS, bytecode};
use sliver_core::cfg_ir::{BlockMap, Explorer, SegmentExit, WIDENED, discover_functions};
use sliver_core::detection::{detect_boundaries, valid_jump_destinations};
use sliver_core::interpreter::{Flow, Frame, StackValue, Termination, step};
use sliver_core::witness::WitnessMode;
use sliver_core::{AnalysisConfig, analyze};
use sliver_utils::errors::{AnalysisError, FailureKind};

#[test]
fn test_two_function_blocks() {
    crate::init_tracing();
    let code = bytecode(TWO_FUNCTIONS);
    let boundaries = detect_boundaries(&code).unwrap();
    let jumps = valid_jump_destinations(&code, boundaries.code_end);
    let discovery =
        discover_functions(&code, &jumps, &boundaries, &AnalysisConfig::default()).unwrap();

    let selectors: Vec<u32> = discovery.functions.keys().copied().collect();
    assert_eq!(selectors, vec![0xaaaaaaaa, 0xbbbbbbbb]);

    let fa = &discovery.functions[&0xaaaaaaaa];
    assert_eq!((fa.dispatch_pc, fa.entry_pc), (13, 46));
    assert_eq!(fa.blocks, BlockMap::from([(0, 13), (13, 17), (46, 7)]));

    let fb = &discovery.functions[&0xbbbbbbbb];
    assert_eq!((fb.dispatch_pc, fb.entry_pc), (30, 53));
    assert_eq!(
        fb.blocks,
        BlockMap::from([(0, 13), (13, 17), (30, 11), (53, 7)])
    );

    // The reverting fallback belongs to no function
    assert_eq!(discovery.graph.segment(41).unwrap().exit, SegmentExit::Sad);
    assert!(!discovery.merged.contains_key(&41));
    assert_eq!(discovery.coverage.unreached, vec![(41, 5), (60, 1)]);
    assert_eq!(discovery.coverage.covered, 55);
}

#[test]
fn test_two_function_report() {
    let code = bytecode(TWO_FUNCTIONS);
    let report = analyze(&code, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.code_end, 61);
    assert_eq!(report.function_count(), 2);

    let WitnessMode::PerFunction(functions) = &report.mode else {
        panic!("expected per-function mode");
    };
    // Gap 4: 30 -> 46 and 41 -> 53 are both too far to bridge
    assert_eq!(
        functions[&0xaaaaaaaa].runs,
        BlockMap::from([(0, 30), (46, 7)])
    );
    assert_eq!(
        functions[&0xbbbbbbbb].runs,
        BlockMap::from([(0, 41), (53, 7)])
    );
    assert_eq!(functions[&0xaaaaaaaa].witness_bytes(), 37);
    assert_eq!(functions[&0xbbbbbbbb].witness_bytes(), 48);
}

#[test]
fn test_larger_gap_bridges_fallback() {
    let code = bytecode(TWO_FUNCTIONS);
    let config = AnalysisConfig {
        gap: 16,
        ..AnalysisConfig::default()
    };
    let report = analyze(&code, &config).unwrap();
    let WitnessMode::PerFunction(functions) = &report.mode else {
        panic!("expected per-function mode");
    };
    assert_eq!(functions[&0xaaaaaaaa].runs, BlockMap::from([(0, 53)]));
    assert_eq!(functions[&0xbbbbbbbb].runs, BlockMap::from([(0, 60)]));
}

#[test]
fn test_symbolic_loop_terminates() {
    // The counter becomes dynamic after one pass, so the second entry repeats the first
    let code = bytecode("CALLVALUE loop: JUMPDEST PUSH1 0x01 ADD PUSH1 :loop JUMP");
    let report = analyze(&code, &AnalysisConfig::default()).unwrap();
    let WitnessMode::WholeContract(witness) = &report.mode else {
        panic!("expected whole-contract mode");
    };
    assert_eq!(witness.blocks, BlockMap::from([(0, 1), (1, 7)]));
    assert_eq!(witness.runs, BlockMap::from([(0, 8)]));
}

#[test]
fn test_concrete_loop_is_widened() {
    // A concrete counter produces a new entry stack on every pass until the cap is hit
    let code = bytecode("PUSH1 0x00 loop: JUMPDEST PUSH1 0x01 ADD PUSH1 :loop JUMP");
    let jumps = valid_jump_destinations(&code, code.len());
    let config = AnalysisConfig {
        max_states_per_segment: 5,
        ..AnalysisConfig::default()
    };
    let mut explorer = Explorer::new(&code, &jumps, &config);
    explorer.explore(Frame::new(&code)).unwrap();
    let (graph, _) = explorer.into_graph();

    let body = graph.segment(2).unwrap();
    assert_eq!(body.length, 7);
    // Five concrete entries, then one widened entry
    assert_eq!(body.entry_stacks.len(), 6);
    assert_eq!(body.entry_stacks[4].as_slice(), &[StackValue::from_u64(4)]);
    assert_eq!(body.entry_stacks[5].as_slice(), &[WIDENED]);
}

#[test]
fn test_bounded_loop_above_state_cap_keeps_its_exit() {
    // for (i = 0; i < 200; i++) {} with the default cap of 64 entry states
    let code = bytecode(
        "PUSH1 0x00
        loop: JUMPDEST PUSH1 0x01 ADD DUP1 PUSH1 0xc8 GT PUSH1 :loop JUMPI
        POP STOP",
    );
    let report = analyze(&code, &AnalysisConfig::default()).unwrap();
    let WitnessMode::WholeContract(witness) = &report.mode else {
        panic!("expected whole-contract mode");
    };
    assert_eq!(witness.blocks, BlockMap::from([(0, 2), (2, 11), (13, 2)]));
    assert!(report.coverage.unreached.is_empty());
    assert_eq!(report.coverage.covered, code.len());
}

#[test]
fn test_deep_stack_compares_only_top_window() {
    // Eleven values, then a loop that bumps the bottom slot and leaves the top ten alone
    let code = bytecode(
        "PUSH1 0x00
        PUSH1 0x01 PUSH1 0x01 PUSH1 0x01 PUSH1 0x01 PUSH1 0x01
        PUSH1 0x01 PUSH1 0x01 PUSH1 0x01 PUSH1 0x01 PUSH1 0x01
        loop: JUMPDEST SWAP10 PUSH1 0x01 ADD SWAP10 PUSH1 :loop JUMP",
    );
    let jumps = valid_jump_destinations(&code, code.len());
    let mut explorer = Explorer::new(&code, &jumps, &AnalysisConfig::default());
    explorer.explore(Frame::new(&code)).unwrap();
    let (graph, _) = explorer.into_graph();

    let body = graph.segment(22).unwrap();
    assert_eq!(body.length, 9);
    assert_eq!(body.entry_stacks.len(), 1);
    assert_eq!(body.entry_stacks[0].len(), 11);
}

#[test]
fn test_analysis_failures_are_classified() {
    let cases: [(&str, FailureKind); 4] = [
        ("CALLVALUE JUMP", FailureKind::DynamicJump),
        ("PUSH1 0x04 JUMP STOP STOP", FailureKind::InvalidJumpDestination),
        ("PUSH1 0x00 DUP1 DUP1 DUP1 DUP1 DUP1 CALL", FailureKind::UnsupportedOperation),
        ("CALLVALUE PUSH1 0x00 PUSH1 0x00 CODECOPY", FailureKind::CodeCopyWithDynamicParameters),
    ];
    for (source, expected) in cases {
        let err = analyze(&bytecode(source), &AnalysisConfig::default()).unwrap_err();
        assert_eq!(err.kind(), expected, "{source}: {err}");
        assert!(!err.is_internal());
    }
    assert_eq!(
        analyze(&bytecode("ADD"), &AnalysisConfig::default()),
        Err(AnalysisError::StackUnderflow { pc: 0 })
    );
}

#[test]
fn test_concrete_codecopy_is_recorded() {
    // PUSH1 len PUSH1 offset PUSH1 dest CODECOPY STOP
    let code = bytecode("PUSH1 0x04 PUSH1 0x02 PUSH1 0x00 CODECOPY STOP");
    let report = analyze(&code, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.code_reads, vec![(2, 4)]);
}

#[test]
fn test_step_reports_control_flow() {
    // PUSH1 0x01 PUSH1 0x06 JUMPI 0x0c JUMPDEST
    let code = [0x60, 0x01, 0x60, 0x06, 0x57, 0x0c, 0x5b];
    let mut frame = Frame::new(&code);
    assert_eq!(step(&mut frame).unwrap(), Flow::Continue);
    assert_eq!(step(&mut frame).unwrap(), Flow::Continue);
    assert_eq!(
        step(&mut frame).unwrap(),
        Flow::Branch {
            target: StackValue::from_u64(6),
            condition: StackValue::from_u64(1),
        }
    );
    assert_eq!(frame.pc, 5);
    assert!(frame.stack.is_empty());
    assert_eq!(step(&mut frame).unwrap(), Flow::Halt(Termination::Sad));
    assert_eq!(frame.pc, 6);
    assert_eq!(step(&mut frame).unwrap(), Flow::Continue);
    assert_eq!(step(&mut frame).unwrap(), Flow::Halt(Termination::Happy));
}
