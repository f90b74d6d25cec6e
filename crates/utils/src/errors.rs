use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the analysis of a single contract.
///
/// Every variant except [`AnalysisError::InternalConsistency`] is an expected outcome for some
/// real-world bytecode: callers tally them by [`FailureKind`] and move on to the next contract.
/// An internal consistency violation means the engine itself broke an invariant and must be
/// surfaced separately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A JUMP or JUMPI target could not be resolved to a constant.
    #[error("dynamic jump target at pc={pc:#x}")]
    DynamicJump { pc: usize },

    /// A resolved jump target is not a recognized JUMPDEST.
    #[error("invalid jump destination {target:#x} at pc={pc:#x}")]
    InvalidJumpDestination { pc: usize, target: usize },

    /// CODECOPY was reached with a non-constant source offset or length.
    #[error("CODECOPY with dynamic parameters at pc={pc:#x}")]
    CodeCopyWithDynamicParameters { pc: usize },

    /// The boundary heuristics could not locate the selector dispatch region.
    #[error("selector block not found")]
    SelectorBlockNotFound,

    /// A segment or consolidation invariant was violated.
    #[error("internal consistency error: {0}")]
    InternalConsistency(String),

    /// An instruction needed more operands than the symbolic stack holds.
    #[error("stack underflow at pc={pc:#x}")]
    StackUnderflow { pc: usize },

    /// The symbolic stack would exceed 1024 entries.
    #[error("stack depth exceeds maximum limit of 1024 at pc={pc:#x}")]
    StackOverflow { pc: usize },

    /// The call/create family is outside the abstract interpreter.
    #[error("unsupported opcode {opcode:#04x} at pc={pc:#x}")]
    UnsupportedOperation { pc: usize, opcode: u8 },

    /// A reachable segment extends past the detected end of runtime code.
    #[error("segment at pc={pc:#x} extends past code end {code_end:#x}")]
    CodeEndExceeded { pc: usize, code_end: usize },

    /// Chunking of the raw bytecode failed.
    #[error("chunking failed: {0}")]
    Chunk(#[from] ChunkError),

    /// A witness run cannot be expressed in the leaf format, e.g. it lies beyond 64 KiB.
    #[error("leaf encoding failed: {0}")]
    Leaf(#[from] LeafError),
}

/// Classification of an [`AnalysisError`] used for batch statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    DynamicJump,
    InvalidJumpDestination,
    CodeCopyWithDynamicParameters,
    SelectorBlockNotFound,
    InternalConsistency,
    StackUnderflow,
    StackOverflow,
    UnsupportedOperation,
    CodeEndExceeded,
    Chunk,
    Leaf,
}

impl AnalysisError {
    /// Returns the tally bucket for this error.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::DynamicJump { .. } => FailureKind::DynamicJump,
            Self::InvalidJumpDestination { .. } => FailureKind::InvalidJumpDestination,
            Self::CodeCopyWithDynamicParameters { .. } => {
                FailureKind::CodeCopyWithDynamicParameters
            }
            Self::SelectorBlockNotFound => FailureKind::SelectorBlockNotFound,
            Self::InternalConsistency(_) => FailureKind::InternalConsistency,
            Self::StackUnderflow { .. } => FailureKind::StackUnderflow,
            Self::StackOverflow { .. } => FailureKind::StackOverflow,
            Self::UnsupportedOperation { .. } => FailureKind::UnsupportedOperation,
            Self::CodeEndExceeded { .. } => FailureKind::CodeEndExceeded,
            Self::Chunk(_) => FailureKind::Chunk,
            Self::Leaf(_) => FailureKind::Leaf,
        }
    }

    /// True for engine bugs that must never be folded into normal failure statistics.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::InternalConsistency(_))
    }

    /// Shorthand for building an [`AnalysisError::InternalConsistency`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalConsistency(msg.into())
    }
}

/// Errors produced by the chunking strategies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk threshold must be greater than zero")]
    ZeroThreshold,
}

/// Errors produced while encoding or decoding a witness leaf.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeafError {
    /// More blocks than the 16-bit count field can describe.
    #[error("too many blocks for a leaf: {0}")]
    TooManyBlocks(usize),
    /// A block start or length does not fit in 16 bits.
    #[error("block field does not fit in 16 bits: {0}")]
    FieldOverflow(usize),
    /// A block reaches past the end of the bytecode.
    #[error("block {start}+{length} exceeds code length {code_len}")]
    OutOfBounds {
        start: usize,
        length: usize,
        code_len: usize,
    },
    /// The encoded leaf ends in the middle of a record.
    #[error("leaf truncated at offset {0}")]
    Truncated(usize),
    /// Bytes remain after the declared number of blocks.
    #[error("{0} trailing bytes after last block")]
    TrailingBytes(usize),
}

/// Custom error type for decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("hex decode failed: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("could not read file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while assembling mnemonic source into bytecode.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The immediate data for a PUSH opcode is invalid (e.g., wrong length or malformed hex).
    #[error("invalid immediate: {0}")]
    InvalidImmediate(String),
    /// The mnemonic is not part of the enabled opcode table.
    #[error("unsupported opcode: {0}")]
    UnsupportedOpcode(String),
    /// A label was referenced but never defined.
    #[error("undefined label: {0}")]
    UndefinedLabel(String),
    /// A label was defined twice.
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),
    /// Failed to decode hex immediate data (e.g., invalid hex characters).
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

/// Errors raised by the batch driver itself, as opposed to per-contract analysis failures.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("could not read batch input '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: malformed record: {source}")]
    Record {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("analysis task failed: {0}")]
    Task(String),
}
