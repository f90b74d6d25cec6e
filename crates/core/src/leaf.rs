//! Binary witness leaf encoding.
//!
//! A leaf is a big-endian `u16` block count followed, for each block, by its `u16` start, its
//! `u16` length and the raw code bytes it covers.

use crate::cfg_ir::BlockMap;
use sliver_utils::errors::LeafError;

/// A block recovered from an encoded leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafBlock {
    /// First code byte of the block.
    pub start: usize,
    /// Length in bytes.
    pub length: usize,
    /// The code bytes carried in the leaf.
    pub bytes: Vec<u8>,
}

/// Serializes `blocks` with their code bytes.
pub fn encode_leaf(blocks: &BlockMap, code: &[u8]) -> Result<Vec<u8>, LeafError> {
    let count = u16::try_from(blocks.len()).map_err(|_| LeafError::TooManyBlocks(blocks.len()))?;
    let payload: usize = blocks.values().sum();
    let mut out = Vec::with_capacity(2 + 4 * blocks.len() + payload);
    out.extend_from_slice(&count.to_be_bytes());

    for (&start, &length) in blocks {
        let bytes = code
            .get(start..start + length)
            .ok_or(LeafError::OutOfBounds {
                start,
                length,
                code_len: code.len(),
            })?;
        out.extend_from_slice(&to_u16(start)?.to_be_bytes());
        out.extend_from_slice(&to_u16(length)?.to_be_bytes());
        out.extend_from_slice(bytes);
    }

    Ok(out)
}

/// Parses a leaf produced by [`encode_leaf`].
pub fn decode_leaf(leaf: &[u8]) -> Result<Vec<LeafBlock>, LeafError> {
    let mut cursor = 0;
    let count = read_u16(leaf, &mut cursor)?;
    let mut blocks = Vec::with_capacity(count);

    for _ in 0..count {
        let start = read_u16(leaf, &mut cursor)?;
        let length = read_u16(leaf, &mut cursor)?;
        let bytes = leaf
            .get(cursor..cursor + length)
            .ok_or(LeafError::Truncated(cursor))?;
        cursor += length;
        blocks.push(LeafBlock {
            start,
            length,
            bytes: bytes.to_vec(),
        });
    }

    if cursor != leaf.len() {
        return Err(LeafError::TrailingBytes(leaf.len() - cursor));
    }
    Ok(blocks)
}

fn to_u16(value: usize) -> Result<u16, LeafError> {
    u16::try_from(value).map_err(|_| LeafError::FieldOverflow(value))
}

fn read_u16(leaf: &[u8], cursor: &mut usize) -> Result<usize, LeafError> {
    let bytes: [u8; 2] = leaf
        .get(*cursor..*cursor + 2)
        .and_then(|b| b.try_into().ok())
        .ok_or(LeafError::Truncated(*cursor))?;
    *cursor += 2;
    Ok(u16::from_be_bytes(bytes) as usize)
}
