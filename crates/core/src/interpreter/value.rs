//! Tagged symbolic stack values.

use crate::opcode::lookup;
use revm::primitives::U256;
use std::fmt;

/// A value on the symbolic operand stack.
///
/// `Concrete` values are known at analysis time. `Dynamic` values depend on something the
/// analysis cannot see (calldata, storage, memory, the environment) and remember the opcode that
/// produced them. Taint is sticky: any operation with a dynamic input yields a dynamic result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackValue {
    /// Known 256-bit value.
    Concrete(U256),
    /// Unknown value, tagged with the opcode that produced it.
    Dynamic(u8),
}

impl StackValue {
    /// Concrete value from a `u64`.
    pub fn from_u64(value: u64) -> Self {
        Self::Concrete(U256::from(value))
    }

    /// Concrete value from a `usize`.
    pub fn from_usize(value: usize) -> Self {
        Self::Concrete(U256::from(value))
    }

    /// The concrete value, if known.
    pub const fn as_concrete(&self) -> Option<U256> {
        match self {
            Self::Concrete(v) => Some(*v),
            Self::Dynamic(_) => None,
        }
    }

    /// The concrete value as a `usize`, saturating on overflow.
    pub fn as_usize(&self) -> Option<usize> {
        self.as_concrete()
            .map(|v| usize::try_from(v).unwrap_or(usize::MAX))
    }

    /// True for tainted values.
    pub const fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }
}

impl fmt::Display for StackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(v) => write!(f, "{v:#x}"),
            Self::Dynamic(op) => match lookup(*op) {
                Some(operation) => write!(f, "<{}>", operation.mnemonic),
                None => write!(f, "<{op:#04x}>"),
            },
        }
    }
}

impl From<U256> for StackValue {
    fn from(value: U256) -> Self {
        Self::Concrete(value)
    }
}
