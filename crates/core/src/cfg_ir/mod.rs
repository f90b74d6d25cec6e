/// Module for discovering reachable code segments and per-function block maps.
///
/// Discovery symbolically executes the bytecode with the abstract interpreter from
/// [`crate::interpreter`], splitting it into code segments (basic blocks) as it goes. The
/// segments and the control-flow edges between them form a [`SegmentGraph`]. On top of that
/// graph, [`discover_functions`] recognizes the selector dispatch checks and collects, for each
/// selector, every segment the function can execute from PC 0.
///
/// # Usage
/// ```rust,ignore
/// let boundaries = detect_boundaries(&code).ok_or(AnalysisError::SelectorBlockNotFound)?;
/// let jumps = valid_jump_destinations(&code, boundaries.code_end);
/// let discovery = discover_functions(&code, &jumps, &boundaries, &AnalysisConfig::default())?;
/// for (selector, function) in &discovery.functions {
///     println!("{selector:#010x}: {} blocks", function.blocks.len());
/// }
/// ```
use crate::interpreter::Stack;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub use self::builder::Explorer;
pub use self::functions::{
    Discovery, FunctionRecord, discover_functions, discover_whole_contract,
};
pub use self::validate::{Coverage, check_coverage, merge_block_maps};
pub use self::visited::{VisitedStates, WIDENED};

mod builder;
mod functions;
mod validate;
mod visited;

/// A 4-byte function selector.
pub type Selector = u32;

/// Ordered map from segment start PC to segment length.
pub type BlockMap = BTreeMap<usize, usize>;

/// How control leaves a code segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentExit {
    /// Execution falls into a JUMPDEST that starts the next segment.
    Fallthrough,
    /// Unconditional JUMP.
    Jump,
    /// JUMPI, with a taken target and a fallthrough successor.
    Branch,
    /// JUMPSUB or RETURNSUB.
    Subroutine,
    /// STOP, RETURN, SELFDESTRUCT, or the end of the code.
    Happy,
    /// REVERT, INVALID, or an unrecognized opcode.
    Sad,
}

/// Represents the type of edge connecting segments in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    /// Sequential execution into a JUMPDEST.
    Fallthrough,
    /// JUMP to a target segment.
    Jump,
    /// JUMPI taken branch.
    BranchTrue,
    /// JUMPI not-taken branch.
    BranchFalse,
}

/// A basic block of the analyzed bytecode, covering `[start, start + length)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// PC of the first instruction.
    pub start: usize,
    /// Length in bytes.
    pub length: usize,
    /// How control leaves the segment.
    pub exit: SegmentExit,
    /// Distinct stacks the segment was explored with.
    pub entry_stacks: Vec<Stack>,
}

impl Segment {
    /// Exclusive end offset.
    pub const fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Explored segments and the control-flow edges between them.
#[derive(Debug, Clone, Default)]
pub struct SegmentGraph {
    /// Segments as nodes, edges labelled by how control transfers.
    pub graph: DiGraph<Segment, EdgeType>,
    /// Mapping of segment start PCs to node indices.
    pub pc_to_node: HashMap<usize, NodeIndex>,
}

impl SegmentGraph {
    /// The segment starting at `pc`, if it was explored.
    pub fn segment(&self, pc: usize) -> Option<&Segment> {
        self.pc_to_node.get(&pc).map(|node| &self.graph[*node])
    }

    /// Number of explored segments.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// True if nothing was explored.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Segments in ascending PC order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        let mut nodes: Vec<_> = self.graph.node_weights().collect();
        nodes.sort_by_key(|segment| segment.start);
        nodes.into_iter()
    }

    /// All explored segments as a block map.
    pub fn block_map(&self) -> BlockMap {
        self.graph
            .node_weights()
            .map(|segment| (segment.start, segment.length))
            .collect()
    }

    /// Segments that can reach `pc` (including the segment at `pc` itself) by walking
    /// predecessor edges backwards.
    pub fn ancestors(&self, pc: usize) -> BlockMap {
        let mut blocks = BlockMap::new();
        let Some(&start) = self.pc_to_node.get(&pc) else {
            return blocks;
        };

        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, start);
        while let Some(node) = bfs.next(reversed) {
            let segment = &self.graph[node];
            blocks.insert(segment.start, segment.length);
        }
        blocks
    }
}
