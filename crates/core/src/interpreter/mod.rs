/// Module implementing the abstract interpreter used by path discovery.
///
/// The interpreter executes one instruction at a time against a [`Frame`], propagating the
/// concrete/dynamic distinction through arithmetic and data movement. It does not model memory,
/// storage, gas or external calls: reads from those produce [`StackValue::Dynamic`] values,
/// writes only pop their operands, and the call/create family fails fast with
/// [`AnalysisError::UnsupportedOperation`]. Control-flow instructions are not followed here;
/// they are handed back to the caller as a [`Flow`].
///
/// # Usage
/// ```rust,ignore
/// let mut frame = Frame::new(&code);
/// loop {
///     match step(&mut frame)? {
///         Flow::Continue => continue,
///         flow => break flow,
///     }
/// }
/// ```
pub mod frame;
pub mod value;

pub use frame::{Frame, STACK_LIMIT, Stack};
pub use value::StackValue;

use crate::opcode::{lookup, op};
use revm::primitives::U256;
use sliver_utils::errors::AnalysisError;

/// Maximum subroutine return stack depth (EIP-2315).
pub const RETURN_STACK_LIMIT: usize = 1023;

/// How a halting instruction ended its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Termination {
    /// STOP, RETURN, SELFDESTRUCT, or running off the end of the code.
    Happy,
    /// REVERT, INVALID, an unrecognized opcode, or a return stack violation.
    Sad,
}

/// Result of executing a single instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Straight-line execution continues at `frame.pc`.
    Continue,
    /// Unconditional JUMP to the popped target.
    Jump { target: StackValue },
    /// JUMPI with its popped target and condition. `frame.pc` holds the fallthrough PC.
    Branch {
        target: StackValue,
        condition: StackValue,
    },
    /// JUMPSUB, or RETURNSUB with a non-empty return stack.
    Subroutine,
    /// The path terminated.
    Halt(Termination),
}

/// Executes the instruction at `frame.pc` and advances the program counter past it.
pub fn step(frame: &mut Frame<'_>) -> Result<Flow, AnalysisError> {
    let pc = frame.pc;
    let code = frame.code();

    let Some(&byte) = code.get(pc) else {
        return Ok(Flow::Halt(Termination::Happy));
    };
    let Some(operation) = lookup(byte) else {
        tracing::trace!("unrecognized opcode {:#04x} at pc={}", byte, pc);
        frame.pc = pc + 1;
        return Ok(Flow::Halt(Termination::Sad));
    };
    frame.pc = pc + operation.width;

    match byte {
        op::STOP | op::RETURN | op::SELFDESTRUCT => return Ok(Flow::Halt(Termination::Happy)),
        op::REVERT | op::INVALID => return Ok(Flow::Halt(Termination::Sad)),
        op::JUMP => {
            let target = frame.stack.pop(pc)?;
            return Ok(Flow::Jump { target });
        }
        op::JUMPI => {
            let target = frame.stack.pop(pc)?;
            let condition = frame.stack.pop(pc)?;
            return Ok(Flow::Branch { target, condition });
        }
        op::JUMPSUB => {
            frame.stack.pop(pc)?;
            if frame.depth >= RETURN_STACK_LIMIT {
                return Ok(Flow::Halt(Termination::Sad));
            }
            frame.depth += 1;
            return Ok(Flow::Subroutine);
        }
        op::RETURNSUB => {
            // An empty return stack is an exceptional halt.
            let Some(depth) = frame.depth.checked_sub(1) else {
                return Ok(Flow::Halt(Termination::Sad));
            };
            frame.depth = depth;
            return Ok(Flow::Subroutine);
        }
        op::CREATE
        | op::CALL
        | op::CALLCODE
        | op::DELEGATECALL
        | op::CREATE2
        | op::STATICCALL => {
            return Err(AnalysisError::UnsupportedOperation { pc, opcode: byte });
        }
        _ => {}
    }

    match byte {
        op::PUSH1..=op::PUSH32 => {
            let value = read_immediate(code, pc, operation.immediate_len());
            frame.stack.push(StackValue::Concrete(value), pc)?;
        }
        op::DUP1..=op::DUP16 => frame.stack.dup((byte - op::DUP1 + 1) as usize, pc)?,
        op::SWAP1..=op::SWAP16 => frame.stack.swap((byte - op::SWAP1 + 1) as usize, pc)?,

        op::ADD => binary(frame, pc, byte, |a, b| a.wrapping_add(b))?,
        op::MUL => binary(frame, pc, byte, |a, b| a.wrapping_mul(b))?,
        op::SUB => binary(frame, pc, byte, |a, b| a.wrapping_sub(b))?,
        op::DIV => binary(frame, pc, byte, |a, b| a.checked_div(b).unwrap_or(U256::ZERO))?,
        op::SDIV => binary(frame, pc, byte, signed_div)?,
        op::MOD => binary(frame, pc, byte, |a, b| a.checked_rem(b).unwrap_or(U256::ZERO))?,
        op::SMOD => binary(frame, pc, byte, signed_rem)?,
        op::ADDMOD => ternary(frame, pc, byte, |a, b, n| a.add_mod(b, n))?,
        op::MULMOD => ternary(frame, pc, byte, |a, b, n| a.mul_mod(b, n))?,
        op::EXP => binary(frame, pc, byte, |a, b| a.pow(b))?,
        op::SIGNEXTEND => binary(frame, pc, byte, sign_extend)?,

        op::LT => binary(frame, pc, byte, |a, b| flag(a < b))?,
        op::GT => binary(frame, pc, byte, |a, b| flag(a > b))?,
        op::SLT => binary(frame, pc, byte, |a, b| flag(signed_lt(a, b)))?,
        op::SGT => binary(frame, pc, byte, |a, b| flag(signed_lt(b, a)))?,
        op::EQ => binary(frame, pc, byte, |a, b| flag(a == b))?,
        op::ISZERO => unary(frame, pc, byte, |a| flag(a.is_zero()))?,
        op::AND => binary(frame, pc, byte, |a, b| a & b)?,
        op::OR => binary(frame, pc, byte, |a, b| a | b)?,
        op::XOR => binary(frame, pc, byte, |a, b| a ^ b)?,
        op::NOT => unary(frame, pc, byte, |a| !a)?,
        op::BYTE => binary(frame, pc, byte, byte_at)?,
        op::SHL => binary(frame, pc, byte, |shift, value| match shift_amount(shift) {
            Some(s) => value << s,
            None => U256::ZERO,
        })?,
        op::SHR => binary(frame, pc, byte, |shift, value| match shift_amount(shift) {
            Some(s) => value >> s,
            None => U256::ZERO,
        })?,
        op::SAR => binary(frame, pc, byte, arithmetic_shift_right)?,

        op::PC => frame.stack.push(StackValue::from_usize(pc), pc)?,
        op::CODESIZE => frame.stack.push(StackValue::from_usize(code.len()), pc)?,
        op::CODECOPY => {
            let [_dest, offset, length] = pop_array::<3>(frame, pc)?;
            match (offset.as_usize(), length.as_usize()) {
                (Some(offset), Some(length)) => {
                    if length > 0 {
                        frame.code_reads.push((offset, length));
                    }
                }
                _ => return Err(AnalysisError::CodeCopyWithDynamicParameters { pc }),
            }
        }

        // Everything else is opaque: consume the inputs, taint the outputs.
        _ => {
            frame.stack.pop_n(operation.inputs, pc)?;
            for _ in 0..operation.outputs {
                frame.stack.push(StackValue::Dynamic(byte), pc)?;
            }
        }
    }

    Ok(Flow::Continue)
}

/// Reads a PUSH immediate, zero-padding on the right when the code ends mid-immediate.
fn read_immediate(code: &[u8], pc: usize, len: usize) -> U256 {
    let start = (pc + 1).min(code.len());
    let end = (pc + 1 + len).min(code.len());
    let available = &code[start..end];

    let mut buf = [0u8; 32];
    let offset = 32 - len;
    buf[offset..offset + available.len()].copy_from_slice(available);
    U256::from_be_bytes(buf)
}

fn pop_array<const N: usize>(
    frame: &mut Frame<'_>,
    pc: usize,
) -> Result<[StackValue; N], AnalysisError> {
    let popped = frame.stack.pop_n(N, pc)?;
    popped
        .try_into()
        .map_err(|_| AnalysisError::internal("pop_n returned the wrong number of values"))
}

fn unary(
    frame: &mut Frame<'_>,
    pc: usize,
    opcode: u8,
    f: impl Fn(U256) -> U256,
) -> Result<(), AnalysisError> {
    let a = frame.stack.pop(pc)?;
    let out = match a {
        StackValue::Concrete(a) => StackValue::Concrete(f(a)),
        StackValue::Dynamic(_) => StackValue::Dynamic(opcode),
    };
    frame.stack.push(out, pc)
}

fn binary(
    frame: &mut Frame<'_>,
    pc: usize,
    opcode: u8,
    f: impl Fn(U256, U256) -> U256,
) -> Result<(), AnalysisError> {
    let [a, b] = pop_array::<2>(frame, pc)?;
    let out = match (a, b) {
        (StackValue::Concrete(a), StackValue::Concrete(b)) => StackValue::Concrete(f(a, b)),
        _ => StackValue::Dynamic(opcode),
    };
    frame.stack.push(out, pc)
}

fn ternary(
    frame: &mut Frame<'_>,
    pc: usize,
    opcode: u8,
    f: impl Fn(U256, U256, U256) -> U256,
) -> Result<(), AnalysisError> {
    let [a, b, c] = pop_array::<3>(frame, pc)?;
    let out = match (a, b, c) {
        (StackValue::Concrete(a), StackValue::Concrete(b), StackValue::Concrete(c)) => {
            StackValue::Concrete(f(a, b, c))
        }
        _ => StackValue::Dynamic(opcode),
    };
    frame.stack.push(out, pc)
}

fn flag(condition: bool) -> U256 {
    if condition { U256::from(1u8) } else { U256::ZERO }
}

fn shift_amount(shift: U256) -> Option<usize> {
    usize::try_from(shift).ok().filter(|s| *s < 256)
}

fn is_negative(value: U256) -> bool {
    value.bit(255)
}

fn negate(value: U256) -> U256 {
    U256::ZERO.wrapping_sub(value)
}

fn magnitude(value: U256) -> U256 {
    if is_negative(value) { negate(value) } else { value }
}

fn signed_div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::ZERO;
    }
    let quotient = magnitude(a) / magnitude(b);
    if is_negative(a) != is_negative(b) {
        negate(quotient)
    } else {
        quotient
    }
}

fn signed_rem(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::ZERO;
    }
    let rem = magnitude(a) % magnitude(b);
    if is_negative(a) { negate(rem) } else { rem }
}

fn signed_lt(a: U256, b: U256) -> bool {
    let sign = U256::from(1u8) << 255usize;
    (a ^ sign) < (b ^ sign)
}

fn sign_extend(byte_index: U256, value: U256) -> U256 {
    let Some(index) = usize::try_from(byte_index).ok().filter(|i| *i < 31) else {
        return value;
    };
    let bit = index * 8 + 7;
    let mask = (U256::from(1u8) << (bit + 1)) - U256::from(1u8);
    if value.bit(bit) { value | !mask } else { value & mask }
}

fn byte_at(index: U256, value: U256) -> U256 {
    match usize::try_from(index).ok().filter(|i| *i < 32) {
        Some(i) => U256::from(value.byte(31 - i)),
        None => U256::ZERO,
    }
}

fn arithmetic_shift_right(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    match shift_amount(shift) {
        Some(s) if negative => !((!value) >> s),
        Some(s) => value >> s,
        None if negative => U256::MAX,
        None => U256::ZERO,
    }
}
