use crate::{TWO_FUNCTIONS, bytecode};
use sliver_core::detection::{
    DispatchMatcher, detect_boundaries, detect_code_end, looks_like_known_preamble,
    valid_jump_destinations,
};

#[test]
fn test_boundaries_of_two_function_contract() {
    crate::init_tracing();
    let code = bytecode(TWO_FUNCTIONS);
    assert!(looks_like_known_preamble(&code));

    let boundaries = detect_boundaries(&code).expect("layout should be recognized");
    tracing::debug!("boundaries: {:?}", boundaries);
    assert_eq!(boundaries.calldata_load_pc, 15);
    assert_eq!(boundaries.selectors, vec![0xaaaaaaaa, 0xbbbbbbbb]);
    // REVERT of the fallback at 45 closes the selector block
    assert_eq!(boundaries.selector_block_end, 46);
    // STOP at 59, INVALID at 60
    assert_eq!(boundaries.code_end, 61);
    assert_eq!(code[boundaries.code_end - 1], 0xfe);
}

#[test]
fn test_jump_table_of_two_function_contract() {
    let code = bytecode(TWO_FUNCTIONS);
    let jumps = valid_jump_destinations(&code, 61);
    assert_eq!(jumps.iter().collect::<Vec<_>>(), vec![41, 46, 53]);
    assert_eq!(jumps.count(), 3);
    assert!(!jumps.is_valid(61));
}

#[test]
fn test_missing_sentinel_is_not_recognized() {
    // Same layout without the INVALID separator
    let source = TWO_FUNCTIONS.replace("INVALID", "");
    let code = bytecode(&source);
    assert!(detect_boundaries(&code).is_none());
}

#[test]
fn test_no_calldataload_is_not_recognized() {
    let code = bytecode("PUSH1 0x80 PUSH1 0x40 MSTORE CALLVALUE STOP INVALID");
    assert!(detect_boundaries(&code).is_none());
}

#[test]
fn test_code_end_steps_over_push_data() {
    // PUSH2 0x00fe (an INVALID byte inside an immediate) STOP INVALID
    let code = [0x61, 0x00, 0xfe, 0x00, 0xfe];
    assert_eq!(detect_code_end(&code, 0), Some(5));
    // RETURN INVALID
    assert_eq!(detect_code_end(&[0xf3, 0xfe], 0), Some(2));
    assert_eq!(detect_code_end(&[0x00, 0x00], 0), None);
}

#[test]
fn test_matcher_sees_both_dispatch_checks() {
    let code = bytecode(TWO_FUNCTIONS);
    let mut matcher = DispatchMatcher::default();
    let hits: Vec<_> = sliver_core::decoder::disassemble(&code[..46])
        .iter()
        .filter_map(|ins| matcher.observe(&code, ins.pc))
        .collect();
    assert_eq!(hits.len(), 2);
    assert_eq!((hits[0].selector, hits[0].target, hits[0].jumpi_pc), (0xaaaaaaaa, 46, 29));
    assert_eq!((hits[1].selector, hits[1].target, hits[1].jumpi_pc), (0xbbbbbbbb, 53, 40));
}
