use sliver_core::decoder::{SourceType, decode_bytecode, disassemble, keccak256};
use sliver_utils::errors::DecodeError;
use std::io::Write;

// Fixture: PUSH1 0x01, PUSH1 0x02, ADD, PUSH1 0x00, JUMP
const BYTECODE: &str = "0x6001600201600056";

#[test]
fn test_hex_decode() {
    crate::init_tracing();
    let (ins, info, bytes) = decode_bytecode(BYTECODE, false).unwrap();
    for instr in &ins {
        tracing::debug!("{}", instr);
    }
    assert_eq!(ins.len(), 5);
    assert_eq!(ins[2].mnemonic, "ADD");
    assert_eq!(ins[4].pc, 7);
    assert_eq!(info.byte_length, 8);
    assert_eq!(info.source, SourceType::HexString);
    assert_eq!(info.keccak_hash, keccak256(&bytes));
}

#[test]
fn test_file_input_matches_hex_input() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    writeln!(tmp, "{BYTECODE}").unwrap();
    let path = tmp.path().to_str().unwrap();

    let (ins_file, info_file, _) = decode_bytecode(path, true).unwrap();
    let (ins_hex, info_hex, _) = decode_bytecode(BYTECODE, false).unwrap();

    assert_eq!(ins_file, ins_hex);
    assert_eq!(info_file.keccak_hash, info_hex.keccak_hash);
    assert_eq!(info_file.source, SourceType::File);
}

#[test]
fn test_missing_file_fails() {
    let result = decode_bytecode("/nonexistent/sliver/code.hex", true);
    assert!(matches!(result, Err(DecodeError::FileRead { .. })));
}

#[test]
fn test_bad_hex_fails() {
    let result = decode_bytecode("0xZZ42", false);
    assert!(matches!(result, Err(DecodeError::HexDecode(_))));
}

#[test]
fn test_keccak_of_empty_input() {
    assert_eq!(
        hex::encode(keccak256(&[])),
        "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
    );
}

#[test]
fn test_unknown_bytes_keep_their_position() {
    // JUMPDEST, 0x0c (unassigned), PUSH1 0xff
    let ins = disassemble(&[0x5b, 0x0c, 0x60, 0xff]);
    assert_eq!(ins.len(), 3);
    assert!(ins[1].is_unknown());
    assert_eq!(ins[1].byte_size(), 1);
    assert_eq!(ins[2].pc, 2);
    assert_eq!(ins[2].to_string(), "000002  PUSH1    0xff");
}

#[test]
fn test_subroutine_opcodes_are_known() {
    let ins = disassemble(&[0x5c, 0x5d, 0x5e, 0x5f]);
    assert_eq!(ins[0].mnemonic, "BEGINSUB");
    assert_eq!(ins[1].mnemonic, "RETURNSUB");
    assert_eq!(ins[2].mnemonic, "JUMPSUB");
    // PUSH0 is not part of the instruction set
    assert!(ins[3].is_unknown());
}
