//! Cross-function consistency checks on discovered block maps.

use super::BlockMap;
use sliver_utils::errors::AnalysisError;

/// How the merged block maps cover the executable code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Bytes inside at least one reachable segment.
    pub covered: usize,
    /// `(start, length)` ranges below the code end that no segment reaches.
    pub unreached: Vec<(usize, usize)>,
}

/// Merges block maps, checking that a shared start always has one length and that no two
/// segments overlap.
pub fn merge_block_maps<'a>(
    maps: impl IntoIterator<Item = &'a BlockMap>,
) -> Result<BlockMap, AnalysisError> {
    let mut merged = BlockMap::new();
    for map in maps {
        for (&start, &length) in map {
            match merged.insert(start, length) {
                Some(previous) if previous != length => {
                    return Err(AnalysisError::internal(format!(
                        "segment at pc={start} has lengths {previous} and {length}"
                    )));
                }
                _ => {}
            }
        }
    }

    let mut previous_end = 0;
    for (&start, &length) in &merged {
        if start < previous_end {
            return Err(AnalysisError::internal(format!(
                "segment at pc={start} overlaps a segment ending at {previous_end}"
            )));
        }
        previous_end = start + length;
    }

    Ok(merged)
}

/// Re-scans `[0, code_end)` against a merged block map.
///
/// Covered ranges are skipped and the gaps between them are reported as unreached. A segment
/// reaching past `code_end` fails with [`AnalysisError::CodeEndExceeded`].
pub fn check_coverage(merged: &BlockMap, code_end: usize) -> Result<Coverage, AnalysisError> {
    let mut coverage = Coverage::default();
    let mut pc = 0;

    for (&start, &length) in merged {
        let end = start + length;
        if end > code_end {
            return Err(AnalysisError::CodeEndExceeded { pc: start, code_end });
        }
        if start > pc {
            coverage.unreached.push((pc, start - pc));
        }
        coverage.covered += length;
        pc = pc.max(end);
    }
    if code_end > pc {
        coverage.unreached.push((pc, code_end - pc));
    }

    tracing::debug!(
        "{} of {} code bytes reachable, {} unreached ranges",
        coverage.covered,
        code_end,
        coverage.unreached.len()
    );
    Ok(coverage)
}
