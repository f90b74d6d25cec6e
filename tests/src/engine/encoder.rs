use sliver_core::decoder::{Instruction, disassemble};
use sliver_core::encoder::{assemble, encode};
use sliver_utils::errors::EncodeError;

fn instruction(opcode: u8, mnemonic: &str, imm: Option<&str>) -> Instruction {
    Instruction {
        pc: 0,
        opcode,
        mnemonic: mnemonic.to_string(),
        imm: imm.map(str::to_string),
    }
}

#[test]
fn encode_push1() {
    let bytes = encode(&[instruction(0x60, "PUSH1", Some("aa"))]).unwrap();
    assert_eq!(bytes, vec![0x60, 0xaa]);
}

#[test]
fn encode_jumpdest_and_return() {
    let bytes = encode(&[
        instruction(0x5b, "JUMPDEST", None),
        instruction(0xf3, "RETURN", None),
    ])
    .unwrap();
    assert_eq!(bytes, vec![0x5b, 0xf3]);
}

#[test]
fn encode_bad_immediate_fails() {
    let result = encode(&[instruction(0x60, "PUSH1", Some("zz"))]);
    assert!(matches!(result, Err(EncodeError::HexDecode(_))));
}

#[test]
fn disassembly_reencodes_fixture() {
    let code = crate::bytecode(crate::TWO_FUNCTIONS);
    assert_eq!(encode(&disassemble(&code)).unwrap(), code);
}

#[test]
fn assemble_resolves_forward_and_backward_labels() {
    let code = assemble(
        "
        top: JUMPDEST PUSH2 :bottom JUMP  ; forward
        bottom: JUMPDEST PUSH1 :top JUMP  # backward
        ",
    )
    .unwrap();
    assert_eq!(code, vec![0x5b, 0x61, 0x00, 0x05, 0x56, 0x5b, 0x60, 0x00, 0x56]);
}

#[test]
fn assemble_left_pads_literals() {
    assert_eq!(assemble("PUSH4 0x1").unwrap(), vec![0x63, 0, 0, 0, 1]);
    assert_eq!(assemble("PUSH2 0x0000ff").unwrap(), vec![0x61, 0x00, 0xff]);
}

#[test]
fn assemble_errors() {
    assert!(matches!(
        assemble("PUSH1 :nowhere"),
        Err(EncodeError::UndefinedLabel(name)) if name == "nowhere"
    ));
    assert!(matches!(
        assemble("a: STOP a: STOP"),
        Err(EncodeError::DuplicateLabel(name)) if name == "a"
    ));
    assert!(matches!(
        assemble("PUSH0"),
        Err(EncodeError::UnsupportedOpcode(_))
    ));
    assert!(matches!(
        assemble("PUSH1 0x0100"),
        Err(EncodeError::InvalidImmediate(_))
    ));
    assert!(matches!(
        assemble("PUSH1"),
        Err(EncodeError::InvalidImmediate(_))
    ));
}
