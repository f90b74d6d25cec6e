//! Function discovery: dispatch pass, per-function passes and validation.

use super::builder::Explorer;
use super::validate::{Coverage, check_coverage, merge_block_maps};
use super::{BlockMap, SegmentGraph, Selector};
use crate::config::AnalysisConfig;
use crate::detection::{CodeBoundaries, JumpTable};
use crate::interpreter::Frame;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sliver_utils::errors::AnalysisError;
use std::collections::BTreeSet;

/// A callable function recognized in the selector dispatch block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// 4-byte selector.
    pub selector: Selector,
    /// Start of the segment that holds the selector comparison.
    pub dispatch_pc: usize,
    /// Taken target of the dispatch JUMPI, where the function body begins.
    pub entry_pc: usize,
    /// Every segment the function can execute, from PC 0 through its body.
    pub blocks: BlockMap,
}

/// Output of a discovery run.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Graph of the initial traversal from PC 0.
    pub graph: SegmentGraph,
    /// Functions in dispatch order. Empty for whole-contract discovery.
    pub functions: IndexMap<Selector, FunctionRecord>,
    /// Union of every function's blocks and the dispatch segments (or, for whole-contract
    /// discovery, every explored segment).
    pub merged: BlockMap,
    /// Reachability of `[0, code_end)` under `merged`.
    pub coverage: Coverage,
    /// Concrete CODECOPY `(offset, length)` ranges seen on any explored path.
    pub code_reads: Vec<(usize, usize)>,
}

/// Discovers each selector's dispatch segment and the blocks its function needs.
///
/// Pass 1 runs from PC 0 but only follows segments starting inside the selector block; every
/// recognized dispatch check yields a function and the frame on its taken branch. Pass 2 reruns
/// the traversal unrestricted from each function's entry frame and adds the pass-1 segments that
/// lead to the function's dispatch check.
///
/// # Arguments
/// * `code` - Runtime bytecode.
/// * `jumps` - Valid jump destinations of `code`.
/// * `boundaries` - Selector block and code end found by [`crate::detection::detect_boundaries`].
/// * `config` - Traversal settings.
///
/// # Returns
/// The [`Discovery`], or the first error hit on any path. Errors abort the whole contract.
pub fn discover_functions(
    code: &[u8],
    jumps: &JumpTable,
    boundaries: &CodeBoundaries,
    config: &AnalysisConfig,
) -> Result<Discovery, AnalysisError> {
    let mut dispatch = Explorer::new(code, jumps, config).with_limit(boundaries.selector_block_end);
    dispatch.explore(Frame::new(code))?;
    let mut code_reads: BTreeSet<(usize, usize)> = dispatch.code_reads().collect();
    let (graph, sites) = dispatch.into_graph();
    tracing::debug!(
        "dispatch pass found {} segments and {} dispatch checks",
        graph.len(),
        sites.len()
    );

    let mut functions: IndexMap<Selector, FunctionRecord> = IndexMap::new();
    for site in sites {
        let selector = site.hit.selector;
        if functions.contains_key(&selector) {
            continue;
        }
        let entry_pc = site.entry.pc;

        let mut body = Explorer::new(code, jumps, config);
        body.explore(site.entry)?;
        code_reads.extend(body.code_reads());
        let (body_graph, _) = body.into_graph();

        let prefix = graph.ancestors(site.segment);
        let blocks = merge_block_maps([&body_graph.block_map(), &prefix])?;
        tracing::debug!(
            "function {:#010x} enters at pc={} with {} blocks",
            selector,
            entry_pc,
            blocks.len()
        );

        functions.insert(
            selector,
            FunctionRecord {
                selector,
                dispatch_pc: site.segment,
                entry_pc,
                blocks,
            },
        );
    }

    for selector in &boundaries.selectors {
        if !functions.contains_key(selector) {
            tracing::debug!("PUSH4 literal {:#010x} is not a dispatch check", selector);
        }
    }

    let dispatch_segments: BlockMap = functions
        .values()
        .filter_map(|f| graph.segment(f.dispatch_pc))
        .map(|segment| (segment.start, segment.length))
        .collect();
    let merged = merge_block_maps(
        functions
            .values()
            .map(|f| &f.blocks)
            .chain(std::iter::once(&dispatch_segments)),
    )?;
    let coverage = check_coverage(&merged, boundaries.code_end)?;

    Ok(Discovery {
        graph,
        functions,
        merged,
        coverage,
        code_reads: code_reads.into_iter().collect(),
    })
}

/// Explores the whole contract from PC 0 without function attribution.
///
/// Used when the bytecode does not start with a recognized compiler preamble.
pub fn discover_whole_contract(
    code: &[u8],
    jumps: &JumpTable,
    code_end: usize,
    config: &AnalysisConfig,
) -> Result<Discovery, AnalysisError> {
    let mut explorer = Explorer::new(code, jumps, config);
    explorer.explore(Frame::new(code))?;
    let code_reads = explorer.code_reads().collect();
    let (graph, _) = explorer.into_graph();

    let merged = merge_block_maps([&graph.block_map()])?;
    let coverage = check_coverage(&merged, code_end)?;

    Ok(Discovery {
        graph,
        functions: IndexMap::new(),
        merged,
        coverage,
        code_reads,
    })
}
