//! Instruction encoding and a small two-pass assembler.
//!
//! The assembler reads whitespace-separated mnemonics. `name:` defines a label at the current
//! PC, `PUSHn :name` pushes a label's PC, `PUSHn 0x..` pushes a literal (left-padded to `n`
//! bytes), and a bare `0x..` token emits raw bytes. Comments start with `;` or `#`.

use crate::decoder::Instruction;
use crate::opcode::{Operation, by_mnemonic};
use sliver_utils::errors::EncodeError;
use std::collections::HashMap;

/// Re-encodes a disassembled instruction stream.
pub fn encode(instructions: &[Instruction]) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::with_capacity(instructions.len() * 3);
    for ins in instructions {
        bytes.push(ins.opcode);
        if let Some(imm) = &ins.imm {
            bytes.extend_from_slice(&hex::decode(imm)?);
        }
    }
    Ok(bytes)
}

enum Item<'s> {
    Op(&'static Operation),
    Push(&'static Operation, Immediate<'s>),
    Raw(Vec<u8>),
}

enum Immediate<'s> {
    Literal(Vec<u8>),
    Label(&'s str),
}

impl Item<'_> {
    fn width(&self) -> usize {
        match self {
            Item::Op(operation) | Item::Push(operation, _) => operation.width,
            Item::Raw(bytes) => bytes.len(),
        }
    }
}

/// Assembles mnemonic source into bytecode.
///
/// # Examples
/// ```
/// use sliver_core::encoder::assemble;
///
/// let code = assemble("PUSH1 :end JUMP end: JUMPDEST STOP").unwrap();
/// assert_eq!(code, vec![0x60, 0x03, 0x56, 0x5b, 0x00]);
/// ```
pub fn assemble(source: &str) -> Result<Vec<u8>, EncodeError> {
    let mut items = Vec::new();
    let mut labels: HashMap<&str, usize> = HashMap::new();
    let mut pc = 0;

    let mut tokens = source
        .lines()
        .map(|line| line.split([';', '#']).next().unwrap_or_default())
        .flat_map(str::split_whitespace);

    while let Some(token) = tokens.next() {
        if let Some(name) = token.strip_suffix(':') {
            if labels.insert(name, pc).is_some() {
                return Err(EncodeError::DuplicateLabel(name.to_string()));
            }
            continue;
        }

        let item = if let Some(hex_str) = token.strip_prefix("0x") {
            Item::Raw(hex::decode(hex_str)?)
        } else {
            let operation =
                by_mnemonic(token).ok_or_else(|| EncodeError::UnsupportedOpcode(token.to_string()))?;
            let size = operation.immediate_len();
            if size == 0 {
                Item::Op(operation)
            } else {
                let arg = tokens.next().ok_or_else(|| {
                    EncodeError::InvalidImmediate(format!("{operation} missing immediate"))
                })?;
                Item::Push(operation, parse_immediate(arg, size)?)
            }
        };
        pc += item.width();
        items.push(item);
    }

    let mut bytes = Vec::with_capacity(pc);
    for item in items {
        match item {
            Item::Op(operation) => bytes.push(operation.opcode),
            Item::Raw(raw) => bytes.extend_from_slice(&raw),
            Item::Push(operation, immediate) => {
                let size = operation.immediate_len();
                let value = match immediate {
                    Immediate::Literal(value) => value,
                    Immediate::Label(name) => {
                        let target = labels
                            .get(name)
                            .ok_or_else(|| EncodeError::UndefinedLabel(name.to_string()))?;
                        left_pad(&target.to_be_bytes(), size, name)?
                    }
                };
                bytes.push(operation.opcode);
                bytes.extend_from_slice(&value);
            }
        }
    }

    tracing::trace!("assembled {} bytes, {} labels", bytes.len(), labels.len());
    Ok(bytes)
}

fn parse_immediate(arg: &str, size: usize) -> Result<Immediate<'_>, EncodeError> {
    if let Some(name) = arg.strip_prefix(':') {
        return Ok(Immediate::Label(name));
    }
    let digits = arg.strip_prefix("0x").unwrap_or(arg);
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let raw = hex::decode(padded)?;
    Ok(Immediate::Literal(left_pad(&raw, size, arg)?))
}

/// Left-pads `raw` to `size` bytes after stripping leading zeros that do not fit.
fn left_pad(raw: &[u8], size: usize, what: &str) -> Result<Vec<u8>, EncodeError> {
    let first = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
    let significant = &raw[first..];
    if significant.len() > size {
        return Err(EncodeError::InvalidImmediate(format!(
            "{what} does not fit in {size} bytes"
        )));
    }
    let mut out = vec![0u8; size - significant.len()];
    out.extend_from_slice(significant);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::disassemble;

    #[test]
    fn literal_immediates_are_left_padded() {
        let code = assemble("PUSH2 0x05 PUSH4 0xaabbccdd").unwrap();
        assert_eq!(code, vec![0x61, 0x00, 0x05, 0x63, 0xaa, 0xbb, 0xcc, 0xdd]);
    }

    #[test]
    fn labels_resolve_forward_and_backward() {
        let code = assemble(
            "top: JUMPDEST ; loop head
             PUSH2 :out JUMP
             out: JUMPDEST PUSH1 :top JUMP",
        )
        .unwrap();
        assert_eq!(code, vec![0x5b, 0x61, 0x00, 0x05, 0x56, 0x5b, 0x60, 0x00, 0x56]);
    }

    #[test]
    fn raw_bytes_and_errors() {
        assert_eq!(assemble("STOP 0xa165").unwrap(), vec![0x00, 0xa1, 0x65]);
        assert!(matches!(
            assemble("PUSH1 :nowhere"),
            Err(EncodeError::UndefinedLabel(_))
        ));
        assert!(matches!(
            assemble("a: a: STOP"),
            Err(EncodeError::DuplicateLabel(_))
        ));
        assert!(matches!(
            assemble("PUSH1 0x0100"),
            Err(EncodeError::InvalidImmediate(_))
        ));
        assert!(matches!(
            assemble("PUSH0"),
            Err(EncodeError::UnsupportedOpcode(_))
        ));
        assert!(matches!(assemble("PUSH1"), Err(EncodeError::InvalidImmediate(_))));
    }

    #[test]
    fn encode_inverts_disassemble() {
        let code = vec![0x60, 0x80, 0x60, 0x40, 0x52, 0x0c, 0x00];
        assert_eq!(encode(&disassemble(&code)).unwrap(), code);
    }
}
