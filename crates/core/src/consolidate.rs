//! Merges nearby blocks of a block map into contiguous runs.

use crate::cfg_ir::BlockMap;
use sliver_utils::errors::AnalysisError;

/// Consolidates `blocks` into runs, merging a block into the current run when it starts no more
/// than `gap` bytes past the run's end. The bytes of a bridged gap become part of the run.
///
/// The first block must start at PC 0; anything else means discovery lost the entry segment.
///
/// # Examples
/// ```
/// use sliver_core::cfg_ir::BlockMap;
/// use sliver_core::consolidate::consolidate;
///
/// let blocks = BlockMap::from([(0, 13), (13, 17), (46, 7)]);
/// let runs = consolidate(&blocks, 4).unwrap();
/// assert_eq!(runs, BlockMap::from([(0, 30), (46, 7)]));
/// ```
pub fn consolidate(blocks: &BlockMap, gap: usize) -> Result<BlockMap, AnalysisError> {
    let mut runs = BlockMap::new();
    let mut iter = blocks.iter();

    let Some((&first, &first_len)) = iter.next() else {
        return Ok(runs);
    };
    if first != 0 {
        return Err(AnalysisError::internal(format!(
            "block map starts at pc={first} instead of 0"
        )));
    }

    let (mut run_start, mut run_end) = (first, first_len);
    for (&start, &length) in iter {
        if start <= run_end + gap {
            run_end = run_end.max(start + length);
        } else {
            runs.insert(run_start, run_end - run_start);
            (run_start, run_end) = (start, start + length);
        }
    }
    runs.insert(run_start, run_end - run_start);

    Ok(runs)
}
