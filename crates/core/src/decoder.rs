//! sliver's single entry-point for turning byte-sequences into instruction streams.

use crate::opcode::{lookup, push_size};
use hex::FromHex;
use sliver_utils::errors::DecodeError;
use std::{fmt, fs, path::Path};
use tiny_keccak::{Hasher, Keccak};

/// Represents a single disassembled instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// the instruction's program counter (in bytes)
    pub pc: usize,
    /// the raw opcode byte
    pub opcode: u8,
    /// Opcode name - the mnemonic (e.g. "PUSH1", "ADD"), or `UNKNOWN(0x..)`
    pub mnemonic: String,
    /// any immediate data (hex string without 0x), if present
    pub imm: Option<String>,
}

impl Instruction {
    /// Returns the number of bytes this instruction occupies in bytecode.
    #[inline]
    pub fn byte_size(&self) -> usize {
        1 + self.imm.as_ref().map_or(0, |imm| imm.len() / 2)
    }

    /// True if the opcode byte is not part of the enabled instruction set.
    pub fn is_unknown(&self) -> bool {
        lookup(self.opcode).is_none()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pc: six-digit hex, opcode left-padded to 8 chars, then optional imm
        if let Some(imm) = &self.imm {
            write!(f, "{:06x}  {:<8} 0x{}", self.pc, self.mnemonic, imm)
        } else {
            write!(f, "{:06x}  {}", self.pc, self.mnemonic)
        }
    }
}

/// Metadata about the decoded bytecode blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeInfo {
    /// number of bytes
    pub byte_length: usize,
    /// a 32-byte Keccak-256 hash of the raw bytes
    pub keccak_hash: [u8; 32],
    /// input from the variants of SourceType
    pub source: SourceType,
}

/// Source type of the bytecode input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    HexString,
    File,
}

/// Keccak-256 of `bytes`.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    keccak.update(bytes);
    let mut hash = [0u8; 32];
    keccak.finalize(&mut hash);
    hash
}

/// Normalizes hex strings by removing whitespace, 0x prefix, and ensuring even length
pub fn normalize_hex_string(input: &str) -> Result<String, DecodeError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let clean = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);

    // Validate hex characters
    if let Some((index, c)) = clean.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(DecodeError::HexDecode(
            hex::FromHexError::InvalidHexCharacter { c, index },
        ));
    }

    // Ensure even length by padding with leading zero if necessary
    Ok(if clean.len() % 2 == 1 {
        format!("0{clean}")
    } else {
        clean.to_string()
    })
}

/// Normalizes input into a byte vector from hex string or file.
pub fn input_to_bytes(input: &str, is_file: bool) -> Result<Vec<u8>, DecodeError> {
    let text = if is_file {
        let path = Path::new(input);
        fs::read_to_string(path).map_err(|e| DecodeError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?
    } else {
        input.to_string()
    };
    let normalized = normalize_hex_string(&text)?;
    Ok(Vec::from_hex(&normalized)?)
}

/// Disassembles raw bytecode into an instruction stream.
///
/// Unrecognized bytes become width-1 `UNKNOWN(0x..)` instructions and decoding continues after
/// them. A PUSH whose immediate runs past the end of the code keeps the bytes that exist.
///
/// # Examples
/// ```
/// use sliver_core::decoder::disassemble;
///
/// let instructions = disassemble(&[0x60, 0x80, 0x0c, 0x00]);
/// assert_eq!(instructions[0].mnemonic, "PUSH1");
/// assert_eq!(instructions[0].imm.as_deref(), Some("80"));
/// assert_eq!(instructions[1].mnemonic, "UNKNOWN(0x0c)");
/// assert_eq!(instructions[2].pc, 3);
/// ```
pub fn disassemble(bytes: &[u8]) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut pc = 0;

    while pc < bytes.len() {
        let opcode = bytes[pc];
        let mnemonic = match lookup(opcode) {
            Some(operation) => operation.mnemonic.clone(),
            None => format!("UNKNOWN({opcode:#04x})"),
        };
        let size = push_size(opcode);
        let imm = (size > 0).then(|| {
            let end = (pc + 1 + size).min(bytes.len());
            hex::encode(&bytes[(pc + 1).min(end)..end])
        });

        instructions.push(Instruction {
            pc,
            opcode,
            mnemonic,
            imm,
        });
        pc += 1 + size;
    }

    tracing::debug!(
        "disassembled {} bytes into {} instructions",
        bytes.len(),
        instructions.len()
    );
    instructions
}

/// Decodes bytecode input into an instruction stream, metadata and the raw bytes.
///
/// # Arguments
/// * `input` - A hex string or file path representing the EVM bytecode.
/// * `is_file` - Flag indicating if the input is a file path (false for hex string).
///
/// # Returns
/// A tuple of (instructions, DecodeInfo, raw bytes), or an error if decoding fails.
pub fn decode_bytecode(
    input: &str,
    is_file: bool,
) -> Result<(Vec<Instruction>, DecodeInfo, Vec<u8>), DecodeError> {
    let bytes = input_to_bytes(input, is_file)?;
    let source = if is_file {
        SourceType::File
    } else {
        SourceType::HexString
    };

    let info = DecodeInfo {
        byte_length: bytes.len(),
        keccak_hash: keccak256(&bytes),
        source,
    };
    Ok((disassemble(&bytes), info, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_prefix_whitespace_and_odd_length() {
        assert_eq!(normalize_hex_string(" 0x60 80\n").unwrap(), "6080");
        assert_eq!(normalize_hex_string("abc").unwrap(), "0abc");
        assert!(normalize_hex_string("0xzz").is_err());
    }

    #[test]
    fn truncated_push_keeps_available_bytes() {
        let instructions = disassemble(&[0x61, 0xaa]);
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].imm.as_deref(), Some("aa"));
    }

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn decode_reports_metadata() {
        let (instructions, info, bytes) = decode_bytecode("0x600100", false).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(info.byte_length, 3);
        assert_eq!(info.source, SourceType::HexString);
        assert_eq!(bytes, vec![0x60, 0x01, 0x00]);
        assert_eq!(instructions[0].byte_size(), 2);
    }
}
