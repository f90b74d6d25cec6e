//! Cross-crate tests for the sliver workspace and the bytecode fixtures they share.

use sliver_core::encoder::assemble;

#[cfg(test)]
mod analysis;
#[cfg(test)]
mod engine;

/// Two-function contract in solc's layout: a calldata-size guard, two selector checks, a
/// reverting fallback, both bodies, then the INVALID sentinel and a metadata trailer.
pub const TWO_FUNCTIONS: &str = "
    PUSH1 0x80 PUSH1 0x40 MSTORE
    PUSH1 0x04 CALLDATASIZE LT PUSH2 :fallback JUMPI
    PUSH1 0x00 CALLDATALOAD PUSH1 0xe0 SHR
    DUP1 PUSH4 0xaaaaaaaa EQ PUSH2 :fa JUMPI
    DUP1 PUSH4 0xbbbbbbbb EQ PUSH2 :fb JUMPI
fallback:
    JUMPDEST PUSH1 0x00 DUP1 REVERT
fa:
    JUMPDEST PUSH1 0x01 PUSH1 0x00 SSTORE STOP
fb:
    JUMPDEST PUSH1 0x02 PUSH1 0x00 SSTORE STOP
    INVALID
    0xa165627a7a72305820
";

/// Assembles a fixture, panicking on malformed source.
pub fn bytecode(source: &str) -> Vec<u8> {
    assemble(source).unwrap_or_else(|e| panic!("fixture does not assemble: {e}"))
}

/// Installs a debug-level subscriber that writes through the test harness. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
