/// Module implementing the three code-chunking strategies.
///
/// All strategies share one skeleton, [`chunk_code`]: it walks the bytecode instruction by
/// instruction and asks a [`BoundaryRule`] where to cut. At the first unrecognized opcode the
/// rest of the code is treated as data and cut blindly into `threshold`-sized pieces. Every
/// strategy returns chunks that tile the whole bytecode in order, so concatenating their
/// payloads reproduces it.
///
/// # Usage
/// ```rust,ignore
/// let jumps = valid_jump_destinations(&code, code.len());
/// let fixed = chunk(&code, Strategy::Fixed, 128, &jumps)?;
/// let strict = chunk_code(&code, &StrictFixedSize::new(32))?;
/// ```
use crate::detection::JumpTable;
use crate::detection::sections::is_sentinel_pair;
use crate::opcode::lookup;
use serde::{Deserialize, Serialize};
use sliver_utils::errors::ChunkError;
use std::fmt;

/// A contiguous piece of bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    /// First byte of the chunk.
    pub start: usize,
    /// Length in bytes.
    pub length: usize,
    /// For offset-tagged chunks, the distance from `start` to the first instruction that begins
    /// inside the chunk.
    pub offset: Option<u8>,
}

impl Chunk {
    /// Exclusive end offset.
    pub const fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Available chunking strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Cut before the instruction that would push a chunk past the threshold.
    Fixed,
    /// Cut only at valid JUMPDESTs once the threshold is reached.
    Jumpdest,
    /// Cut every `threshold` bytes, tagging the first-instruction offset.
    Strict,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("fixed"),
            Self::Jumpdest => f.write_str("jumpdest"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

/// Decides where chunks end.
pub trait BoundaryRule {
    /// Target chunk size. Must be non-zero.
    fn threshold(&self) -> usize;

    /// Boundary forced by the instruction `[pc, end)` given the current chunk start, if any.
    /// A returned cut must be greater than `chunk_start`.
    fn next_cut(&self, chunk_start: usize, pc: usize, end: usize) -> Option<usize>;

    /// Exclusive end of executable code if the instruction at `pc` confirms it.
    fn confirms_code_end(&self, _code: &[u8], _pc: usize) -> Option<usize> {
        None
    }

    /// Whether chunks carry a first-instruction offset.
    fn tags_offsets(&self) -> bool {
        false
    }

    /// Whether the data region continues the current grid instead of closing the open chunk.
    fn continues_grid(&self) -> bool {
        false
    }
}

/// Chunks of at most `threshold` bytes, cut on instruction boundaries.
#[derive(Debug, Clone, Copy)]
pub struct FixedSize {
    threshold: usize,
}

impl FixedSize {
    /// Creates the rule.
    pub const fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

impl BoundaryRule for FixedSize {
    fn threshold(&self) -> usize {
        self.threshold
    }

    fn next_cut(&self, chunk_start: usize, pc: usize, end: usize) -> Option<usize> {
        (pc > chunk_start && end - chunk_start > self.threshold).then_some(pc)
    }

    fn confirms_code_end(&self, code: &[u8], pc: usize) -> Option<usize> {
        is_sentinel_pair(code, pc).then_some(pc + 2)
    }
}

/// Chunks of at least `threshold` bytes, cut only at valid jump destinations.
#[derive(Debug, Clone, Copy)]
pub struct JumpdestAligned<'a> {
    threshold: usize,
    jumps: &'a JumpTable,
}

impl<'a> JumpdestAligned<'a> {
    /// Creates the rule over the given destination set.
    pub const fn new(threshold: usize, jumps: &'a JumpTable) -> Self {
        Self { threshold, jumps }
    }
}

impl BoundaryRule for JumpdestAligned<'_> {
    fn threshold(&self) -> usize {
        self.threshold
    }

    fn next_cut(&self, chunk_start: usize, pc: usize, _end: usize) -> Option<usize> {
        (pc - chunk_start >= self.threshold && self.jumps.is_valid(pc)).then_some(pc)
    }
}

/// Chunks of exactly `threshold` bytes (the last may be shorter), cut regardless of
/// instruction boundaries.
#[derive(Debug, Clone, Copy)]
pub struct StrictFixedSize {
    threshold: usize,
}

impl StrictFixedSize {
    /// Creates the rule.
    pub const fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

impl BoundaryRule for StrictFixedSize {
    fn threshold(&self) -> usize {
        self.threshold
    }

    fn next_cut(&self, chunk_start: usize, _pc: usize, end: usize) -> Option<usize> {
        let cut = chunk_start + self.threshold;
        (end > cut).then_some(cut)
    }

    fn tags_offsets(&self) -> bool {
        true
    }

    fn continues_grid(&self) -> bool {
        true
    }
}

/// Splits `code` into chunks according to `rule`.
///
/// # Arguments
/// * `code` - Raw bytecode.
/// * `rule` - Boundary rule of the strategy.
///
/// # Returns
/// Chunks tiling `code` in order, or [`ChunkError::ZeroThreshold`].
pub fn chunk_code<R: BoundaryRule>(code: &[u8], rule: &R) -> Result<Vec<Chunk>, ChunkError> {
    let threshold = rule.threshold();
    if threshold == 0 {
        return Err(ChunkError::ZeroThreshold);
    }

    let mut builder = ChunkList::new(rule.tags_offsets());
    let mut start = 0;
    let mut pc = 0;
    let mut code_end = None;

    let data_start = loop {
        if pc >= code.len() || code_end == Some(pc) {
            break pc.min(code.len());
        }
        let Some(operation) = lookup(code[pc]) else {
            tracing::debug!("chunking hit data at pc={}", pc);
            break pc;
        };
        let end = (pc + operation.width).min(code.len());

        while let Some(cut) = rule.next_cut(start, pc, end) {
            builder.push(start, cut - start);
            builder.carry = if cut > pc { end.saturating_sub(cut) } else { 0 };
            start = cut;
        }
        if code_end.is_none() {
            code_end = rule.confirms_code_end(code, pc);
        }
        pc = end;
    };

    if rule.continues_grid() {
        while start < code.len() {
            let length = threshold.min(code.len() - start);
            builder.push(start, length);
            builder.carry = 0;
            start += length;
        }
    } else {
        if data_start > start {
            builder.push(start, data_start - start);
            builder.carry = 0;
            start = data_start;
        }
        while start < code.len() {
            let length = threshold.min(code.len() - start);
            builder.push(start, length);
            start += length;
        }
    }

    Ok(builder.chunks)
}

/// Runs `strategy` with the given threshold.
pub fn chunk(
    code: &[u8],
    strategy: Strategy,
    threshold: usize,
    jumps: &JumpTable,
) -> Result<Vec<Chunk>, ChunkError> {
    match strategy {
        Strategy::Fixed => chunk_code(code, &FixedSize::new(threshold)),
        Strategy::Jumpdest => chunk_code(code, &JumpdestAligned::new(threshold, jumps)),
        Strategy::Strict => chunk_code(code, &StrictFixedSize::new(threshold)),
    }
}

struct ChunkList {
    chunks: Vec<Chunk>,
    tagged: bool,
    /// Bytes of a straddling instruction that spill into the open chunk.
    carry: usize,
}

impl ChunkList {
    const fn new(tagged: bool) -> Self {
        Self {
            chunks: Vec::new(),
            tagged,
            carry: 0,
        }
    }

    fn push(&mut self, start: usize, length: usize) {
        let offset = self
            .tagged
            .then(|| u8::try_from(self.carry.min(length)).unwrap_or(u8::MAX));
        self.chunks.push(Chunk {
            start,
            length,
            offset,
        });
    }
}
