/// Module defining the EVM instruction model used by every analysis stage.
///
/// The table maps each opcode byte of the enabled fork to an [`Operation`] carrying its
/// mnemonic, instruction width (opcode byte plus immediate bytes) and stack arity. It is built
/// exactly once on first use and never mutated afterwards. Bytes without an entry are
/// unrecognized: callers treat them as width 1.
///
/// The enabled fork is the Istanbul instruction set extended with the EIP-2315 subroutine
/// opcodes (`BEGINSUB`, `RETURNSUB`, `JUMPSUB`).
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Named opcode bytes referenced directly by the analysis.
pub mod op {
    pub const STOP: u8 = 0x00;
    pub const ADD: u8 = 0x01;
    pub const MUL: u8 = 0x02;
    pub const SUB: u8 = 0x03;
    pub const DIV: u8 = 0x04;
    pub const SDIV: u8 = 0x05;
    pub const MOD: u8 = 0x06;
    pub const SMOD: u8 = 0x07;
    pub const ADDMOD: u8 = 0x08;
    pub const MULMOD: u8 = 0x09;
    pub const EXP: u8 = 0x0a;
    pub const SIGNEXTEND: u8 = 0x0b;
    pub const LT: u8 = 0x10;
    pub const GT: u8 = 0x11;
    pub const SLT: u8 = 0x12;
    pub const SGT: u8 = 0x13;
    pub const EQ: u8 = 0x14;
    pub const ISZERO: u8 = 0x15;
    pub const AND: u8 = 0x16;
    pub const OR: u8 = 0x17;
    pub const XOR: u8 = 0x18;
    pub const NOT: u8 = 0x19;
    pub const BYTE: u8 = 0x1a;
    pub const SHL: u8 = 0x1b;
    pub const SHR: u8 = 0x1c;
    pub const SAR: u8 = 0x1d;
    pub const SHA3: u8 = 0x20;
    pub const CALLVALUE: u8 = 0x34;
    pub const CALLDATALOAD: u8 = 0x35;
    pub const CALLDATASIZE: u8 = 0x36;
    pub const CODESIZE: u8 = 0x38;
    pub const CODECOPY: u8 = 0x39;
    pub const EXTCODECOPY: u8 = 0x3c;
    pub const POP: u8 = 0x50;
    pub const MLOAD: u8 = 0x51;
    pub const MSTORE: u8 = 0x52;
    pub const SLOAD: u8 = 0x54;
    pub const SSTORE: u8 = 0x55;
    pub const JUMP: u8 = 0x56;
    pub const JUMPI: u8 = 0x57;
    pub const PC: u8 = 0x58;
    pub const JUMPDEST: u8 = 0x5b;
    pub const BEGINSUB: u8 = 0x5c;
    pub const RETURNSUB: u8 = 0x5d;
    pub const JUMPSUB: u8 = 0x5e;
    pub const PUSH1: u8 = 0x60;
    pub const PUSH2: u8 = 0x61;
    pub const PUSH4: u8 = 0x63;
    pub const PUSH32: u8 = 0x7f;
    pub const DUP1: u8 = 0x80;
    pub const DUP16: u8 = 0x8f;
    pub const SWAP1: u8 = 0x90;
    pub const SWAP16: u8 = 0x9f;
    pub const LOG0: u8 = 0xa0;
    pub const LOG4: u8 = 0xa4;
    pub const CREATE: u8 = 0xf0;
    pub const CALL: u8 = 0xf1;
    pub const CALLCODE: u8 = 0xf2;
    pub const RETURN: u8 = 0xf3;
    pub const DELEGATECALL: u8 = 0xf4;
    pub const CREATE2: u8 = 0xf5;
    pub const STATICCALL: u8 = 0xfa;
    pub const REVERT: u8 = 0xfd;
    pub const INVALID: u8 = 0xfe;
    pub const SELFDESTRUCT: u8 = 0xff;
}

/// Static description of a single opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The opcode byte.
    pub opcode: u8,
    /// Mnemonic, e.g. `PUSH1` or `JUMPDEST`.
    pub mnemonic: String,
    /// Instruction width in bytes: 1 plus the immediate length.
    pub width: usize,
    /// Stack items consumed.
    pub inputs: usize,
    /// Stack items produced.
    pub outputs: usize,
}

impl Operation {
    fn new(opcode: u8, mnemonic: impl Into<String>, inputs: usize, outputs: usize) -> Self {
        Self {
            opcode,
            mnemonic: mnemonic.into(),
            width: 1 + push_size(opcode),
            inputs,
            outputs,
        }
    }

    /// Number of immediate bytes following the opcode.
    pub const fn immediate_len(&self) -> usize {
        self.width - 1
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic)
    }
}

/// Immutable opcode table for the enabled fork.
#[derive(Debug)]
pub struct OpcodeTable {
    ops: Vec<Option<Operation>>,
    by_mnemonic: HashMap<String, u8>,
}

static TABLE: LazyLock<OpcodeTable> = LazyLock::new(OpcodeTable::build);

/// Looks up an opcode byte in the enabled fork's table.
///
/// # Examples
/// ```
/// use sliver_core::opcode::lookup;
///
/// let push2 = lookup(0x61).unwrap();
/// assert_eq!(push2.mnemonic, "PUSH2");
/// assert_eq!(push2.width, 3);
/// assert!(lookup(0x0c).is_none());
/// ```
pub fn lookup(opcode: u8) -> Option<&'static Operation> {
    TABLE.get(opcode)
}

/// Reverse lookup by (case-insensitive) mnemonic.
pub fn by_mnemonic(mnemonic: &str) -> Option<&'static Operation> {
    TABLE.by_mnemonic(mnemonic)
}

/// Width of the instruction starting with `opcode`; unknown bytes are width 1.
pub fn width_of(opcode: u8) -> usize {
    lookup(opcode).map_or(1, |op| op.width)
}

/// Number of immediate bytes for PUSH1..PUSH32, zero otherwise.
pub const fn push_size(opcode: u8) -> usize {
    if opcode >= op::PUSH1 && opcode <= op::PUSH32 {
        (opcode - op::PUSH1 + 1) as usize
    } else {
        0
    }
}

/// Returns true for opcodes that end execution of the current call frame.
pub const fn is_terminal(opcode: u8) -> bool {
    matches!(
        opcode,
        op::STOP | op::RETURN | op::REVERT | op::INVALID | op::SELFDESTRUCT
    )
}

impl OpcodeTable {
    /// Returns the operation for `opcode`, if enabled.
    pub fn get(&self, opcode: u8) -> Option<&Operation> {
        self.ops[opcode as usize].as_ref()
    }

    /// Reverse lookup by mnemonic.
    pub fn by_mnemonic(&self, mnemonic: &str) -> Option<&Operation> {
        let code = self.by_mnemonic.get(&mnemonic.to_ascii_uppercase())?;
        self.get(*code)
    }

    /// Number of enabled opcodes.
    pub fn len(&self) -> usize {
        self.ops.iter().filter(|op| op.is_some()).count()
    }

    /// True if no opcode is enabled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build() -> Self {
        // (opcode, mnemonic, inputs, outputs)
        const FIXED: &[(u8, &str, usize, usize)] = &[
            (0x00, "STOP", 0, 0),
            (0x01, "ADD", 2, 1),
            (0x02, "MUL", 2, 1),
            (0x03, "SUB", 2, 1),
            (0x04, "DIV", 2, 1),
            (0x05, "SDIV", 2, 1),
            (0x06, "MOD", 2, 1),
            (0x07, "SMOD", 2, 1),
            (0x08, "ADDMOD", 3, 1),
            (0x09, "MULMOD", 3, 1),
            (0x0a, "EXP", 2, 1),
            (0x0b, "SIGNEXTEND", 2, 1),
            (0x10, "LT", 2, 1),
            (0x11, "GT", 2, 1),
            (0x12, "SLT", 2, 1),
            (0x13, "SGT", 2, 1),
            (0x14, "EQ", 2, 1),
            (0x15, "ISZERO", 1, 1),
            (0x16, "AND", 2, 1),
            (0x17, "OR", 2, 1),
            (0x18, "XOR", 2, 1),
            (0x19, "NOT", 1, 1),
            (0x1a, "BYTE", 2, 1),
            (0x1b, "SHL", 2, 1),
            (0x1c, "SHR", 2, 1),
            (0x1d, "SAR", 2, 1),
            (0x20, "SHA3", 2, 1),
            (0x30, "ADDRESS", 0, 1),
            (0x31, "BALANCE", 1, 1),
            (0x32, "ORIGIN", 0, 1),
            (0x33, "CALLER", 0, 1),
            (0x34, "CALLVALUE", 0, 1),
            (0x35, "CALLDATALOAD", 1, 1),
            (0x36, "CALLDATASIZE", 0, 1),
            (0x37, "CALLDATACOPY", 3, 0),
            (0x38, "CODESIZE", 0, 1),
            (0x39, "CODECOPY", 3, 0),
            (0x3a, "GASPRICE", 0, 1),
            (0x3b, "EXTCODESIZE", 1, 1),
            (0x3c, "EXTCODECOPY", 4, 0),
            (0x3d, "RETURNDATASIZE", 0, 1),
            (0x3e, "RETURNDATACOPY", 3, 0),
            (0x3f, "EXTCODEHASH", 1, 1),
            (0x40, "BLOCKHASH", 1, 1),
            (0x41, "COINBASE", 0, 1),
            (0x42, "TIMESTAMP", 0, 1),
            (0x43, "NUMBER", 0, 1),
            (0x44, "DIFFICULTY", 0, 1),
            (0x45, "GASLIMIT", 0, 1),
            (0x46, "CHAINID", 0, 1),
            (0x47, "SELFBALANCE", 0, 1),
            (0x50, "POP", 1, 0),
            (0x51, "MLOAD", 1, 1),
            (0x52, "MSTORE", 2, 0),
            (0x53, "MSTORE8", 2, 0),
            (0x54, "SLOAD", 1, 1),
            (0x55, "SSTORE", 2, 0),
            (0x56, "JUMP", 1, 0),
            (0x57, "JUMPI", 2, 0),
            (0x58, "PC", 0, 1),
            (0x59, "MSIZE", 0, 1),
            (0x5a, "GAS", 0, 1),
            (0x5b, "JUMPDEST", 0, 0),
            (0x5c, "BEGINSUB", 0, 0),
            (0x5d, "RETURNSUB", 0, 0),
            (0x5e, "JUMPSUB", 1, 0),
            (0xf0, "CREATE", 3, 1),
            (0xf1, "CALL", 7, 1),
            (0xf2, "CALLCODE", 7, 1),
            (0xf3, "RETURN", 2, 0),
            (0xf4, "DELEGATECALL", 6, 1),
            (0xf5, "CREATE2", 4, 1),
            (0xfa, "STATICCALL", 6, 1),
            (0xfd, "REVERT", 2, 0),
            (0xfe, "INVALID", 0, 0),
            (0xff, "SELFDESTRUCT", 1, 0),
        ];

        let mut ops: Vec<Option<Operation>> = vec![None; 256];
        for &(code, name, inputs, outputs) in FIXED {
            ops[code as usize] = Some(Operation::new(code, name, inputs, outputs));
        }
        for n in 1..=32u8 {
            let code = op::PUSH1 + n - 1;
            ops[code as usize] = Some(Operation::new(code, format!("PUSH{n}"), 0, 1));
        }
        for n in 1..=16u8 {
            let dup = op::DUP1 + n - 1;
            ops[dup as usize] = Some(Operation::new(
                dup,
                format!("DUP{n}"),
                n as usize,
                n as usize + 1,
            ));
            let swap = op::SWAP1 + n - 1;
            ops[swap as usize] = Some(Operation::new(
                swap,
                format!("SWAP{n}"),
                n as usize + 1,
                n as usize + 1,
            ));
        }
        for n in 0..=4u8 {
            let code = op::LOG0 + n;
            ops[code as usize] = Some(Operation::new(code, format!("LOG{n}"), 2 + n as usize, 0));
        }

        let by_mnemonic = ops
            .iter()
            .flatten()
            .map(|op| (op.mnemonic.clone(), op.opcode))
            .collect();

        Self { ops, by_mnemonic }
    }
}
