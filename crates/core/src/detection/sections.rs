//! Byte-level boundary scans over raw runtime bytecode.

use crate::opcode::{op, width_of};
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Runtime preambles emitted by solc (`PUSH1 0x80 PUSH1 0x40 MSTORE` and the pre-0.4.22 form).
const KNOWN_PREAMBLES: [[u8; 5]; 2] = [
    [op::PUSH1, 0x80, op::PUSH1, 0x40, op::MSTORE],
    [op::PUSH1, 0x60, op::PUSH1, 0x40, op::MSTORE],
];

/// Returns true when `code` starts with a compiler-generated free-memory-pointer preamble.
///
/// # Examples
/// ```
/// use sliver_core::detection::looks_like_known_preamble;
///
/// assert!(looks_like_known_preamble(&[0x60, 0x80, 0x60, 0x40, 0x52]));
/// assert!(!looks_like_known_preamble(&[0x00; 5]));
/// assert!(!looks_like_known_preamble(&[0x60, 0x80]));
/// ```
pub fn looks_like_known_preamble(code: &[u8]) -> bool {
    code.get(..5)
        .is_some_and(|head| KNOWN_PREAMBLES.iter().any(|p| p.as_slice() == head))
}

/// Set of valid JUMPDEST offsets, one bit per byte of code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpTable {
    bits: BitVec<u8, Lsb0>,
}

impl JumpTable {
    /// True if `pc` is a recorded JUMPDEST.
    pub fn is_valid(&self, pc: usize) -> bool {
        self.bits.get(pc).is_some_and(|bit| *bit)
    }

    /// Number of recorded destinations.
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Recorded destinations in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }
}

/// Collects JUMPDEST offsets below `end` by a linear scan from PC 0.
///
/// The scan steps over PUSH immediates so data bytes that happen to equal `0x5b` are not
/// reported. The first unrecognized opcode stops the scan; the table then only covers the
/// prefix before it.
///
/// # Arguments
/// * `code` - Raw runtime bytecode.
/// * `end` - Exclusive upper bound of the scan (clamped to the code length).
///
/// # Returns
/// A [`JumpTable`] sized to the code.
pub fn valid_jump_destinations(code: &[u8], end: usize) -> JumpTable {
    let end = end.min(code.len());
    let mut bits = bitvec![u8, Lsb0; 0; code.len()];
    let mut pc = 0;

    while pc < end {
        let byte = code[pc];
        if crate::opcode::lookup(byte).is_none() {
            tracing::warn!(
                "jumpdest scan stopped at unrecognized opcode {:#04x} at pc={}",
                byte,
                pc
            );
            break;
        }
        if byte == op::JUMPDEST {
            bits.set(pc, true);
        }
        pc += width_of(byte);
    }

    JumpTable { bits }
}

/// Region boundaries inferred from the compiler's code layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBoundaries {
    /// PC of the first CALLDATALOAD.
    pub calldata_load_pc: usize,
    /// Every PUSH4 literal seen in the selector block, in code order.
    pub selectors: Vec<u32>,
    /// Exclusive end of the selector dispatch block.
    pub selector_block_end: usize,
    /// Exclusive end of the executable code (past the INVALID that separates code from data).
    pub code_end: usize,
}

/// Scans `code` for the selector block and the end of executable code.
///
/// 1. Advance to the first CALLDATALOAD.
/// 2. Record every PUSH4 literal until the first REVERT, STOP or RETURN, which closes the
///    selector block.
/// 3. Find a JUMP, RETURN or STOP immediately followed by INVALID; that INVALID ends the code.
///
/// All phases step by instruction width. Running off the end of the buffer in any phase means
/// the layout was not recognized and yields `None`.
pub fn detect_boundaries(code: &[u8]) -> Option<CodeBoundaries> {
    let mut pc = 0;

    while *code.get(pc)? != op::CALLDATALOAD {
        pc += width_of(code[pc]);
    }
    let calldata_load_pc = pc;

    let mut selectors = Vec::new();
    loop {
        let byte = *code.get(pc)?;
        match byte {
            op::PUSH4 => {
                // A truncated PUSH4 at the end of code is never a selector.
                let imm: [u8; 4] = code.get(pc + 1..pc + 5)?.try_into().ok()?;
                selectors.push(u32::from_be_bytes(imm));
            }
            op::REVERT | op::STOP | op::RETURN => break,
            _ => {}
        }
        pc += width_of(byte);
    }
    let selector_block_end = pc + 1;
    tracing::debug!(
        "selector block ends at {} with {} candidate selectors",
        selector_block_end,
        selectors.len()
    );

    let code_end = detect_code_end(code, selector_block_end)?;

    Some(CodeBoundaries {
        calldata_load_pc,
        selectors,
        selector_block_end,
        code_end,
    })
}

/// Finds the end-of-code sentinel (JUMP, RETURN or STOP immediately followed by INVALID) at or
/// after `from`, returning the exclusive end past the INVALID.
pub fn detect_code_end(code: &[u8], from: usize) -> Option<usize> {
    let mut pc = from;
    loop {
        let byte = *code.get(pc)?;
        let next = pc + width_of(byte);
        if is_sentinel_pair(code, pc) {
            return Some(next + 1);
        }
        pc = next;
    }
}

/// True when the instruction at `pc` is JUMP, RETURN or STOP and the next byte is INVALID.
pub(crate) fn is_sentinel_pair(code: &[u8], pc: usize) -> bool {
    matches!(code.get(pc), Some(&(op::JUMP | op::RETURN | op::STOP)))
        && code.get(pc + 1) == Some(&op::INVALID)
}
