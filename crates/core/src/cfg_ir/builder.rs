//! Worklist-driven symbolic traversal that splits bytecode into segments.

use super::{EdgeType, Segment, SegmentExit, SegmentGraph, VisitedStates};
use crate::config::AnalysisConfig;
use crate::detection::{DispatchHit, DispatchMatcher, JumpTable};
use crate::interpreter::{self, Flow, Frame, StackValue, Termination};
use crate::opcode::op;
use indexmap::IndexSet;
use sliver_utils::errors::AnalysisError;
use std::collections::{BTreeMap, BTreeSet};

/// A pending segment entry: the frame to run and the segment it came from.
type WorkItem<'a> = (Frame<'a>, Option<(usize, EdgeType)>);

/// Segment that was closed, before it is placed in a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Closed {
    length: usize,
    exit: SegmentExit,
}

/// A dispatch check found during traversal, with the frame on its taken branch.
#[derive(Debug, Clone)]
pub struct DispatchSite<'a> {
    /// The matched comparison.
    pub hit: DispatchHit,
    /// Start of the segment that holds the check.
    pub segment: usize,
    /// Frame positioned at the function body, as captured at the JUMPI.
    pub entry: Frame<'a>,
}

/// Depth-first symbolic explorer over one contract's bytecode.
///
/// The explorer keeps an explicit LIFO worklist of `(frame, predecessor)` items. Each popped
/// item runs one segment to its exit, records the segment, and pushes its successors. An
/// optional `limit` restricts which segment starts are followed; jumps past it are still
/// validated and their edges recorded.
#[derive(Debug)]
pub struct Explorer<'a> {
    code: &'a [u8],
    jumps: &'a JumpTable,
    limit: Option<usize>,
    visited: VisitedStates,
    segments: BTreeMap<usize, Closed>,
    edges: IndexSet<(usize, usize, EdgeType)>,
    dispatch_sites: Vec<DispatchSite<'a>>,
    code_reads: BTreeSet<(usize, usize)>,
}

impl<'a> Explorer<'a> {
    /// Creates an explorer over `code` using the destinations in `jumps`.
    pub fn new(code: &'a [u8], jumps: &'a JumpTable, config: &AnalysisConfig) -> Self {
        Self {
            code,
            jumps,
            limit: None,
            visited: VisitedStates::new(
                config.stack_compare_window,
                config.max_states_per_segment,
            ),
            segments: BTreeMap::new(),
            edges: IndexSet::new(),
            dispatch_sites: Vec::new(),
            code_reads: BTreeSet::new(),
        }
    }

    /// Only follow segments starting below `limit`.
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Explores everything reachable from `entry`.
    pub fn explore(&mut self, entry: Frame<'a>) -> Result<(), AnalysisError> {
        let mut worklist: Vec<WorkItem<'a>> = vec![(entry, None)];

        while let Some((mut frame, predecessor)) = worklist.pop() {
            let start = frame.pc;
            if let Some((from, edge)) = predecessor {
                self.edges.insert((from, start, edge));
            }
            if self.limit.is_some_and(|limit| start >= limit) {
                tracing::trace!("not following segment at pc={} past limit", start);
                continue;
            }
            let Some(stack) = self.visited.admit(start, &frame.stack) else {
                continue;
            };
            frame.stack = stack;
            self.run_segment(frame, &mut worklist)?;
        }

        Ok(())
    }

    /// Dispatch checks seen so far, in discovery order.
    pub fn dispatch_sites(&self) -> &[DispatchSite<'a>] {
        &self.dispatch_sites
    }

    /// Concrete CODECOPY ranges read along explored paths.
    pub fn code_reads(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.code_reads.iter().copied()
    }

    /// Consumes the explorer into a segment graph. Edges to segments that were never explored
    /// are dropped.
    pub fn into_graph(mut self) -> (SegmentGraph, Vec<DispatchSite<'a>>) {
        let mut entries = self.visited.take();
        let mut graph = SegmentGraph::default();

        for (start, closed) in &self.segments {
            let node = graph.graph.add_node(Segment {
                start: *start,
                length: closed.length,
                exit: closed.exit,
                entry_stacks: entries.remove(start).unwrap_or_default(),
            });
            graph.pc_to_node.insert(*start, node);
        }
        for (from, to, edge) in &self.edges {
            if let (Some(a), Some(b)) = (graph.pc_to_node.get(from), graph.pc_to_node.get(to)) {
                graph.graph.add_edge(*a, *b, *edge);
            }
        }

        tracing::debug!(
            "segment graph has {} segments and {} edges",
            graph.graph.node_count(),
            graph.graph.edge_count()
        );
        (graph, self.dispatch_sites)
    }

    fn run_segment(
        &mut self,
        mut frame: Frame<'a>,
        worklist: &mut Vec<WorkItem<'a>>,
    ) -> Result<(), AnalysisError> {
        let start = frame.pc;
        let code_len = self.code.len();
        let mut matcher = DispatchMatcher::default();

        loop {
            let pc = frame.pc;

            if pc >= code_len {
                self.close(&frame, start, code_len, SegmentExit::Happy)?;
                return Ok(());
            }
            if pc > start && self.code[pc] == op::JUMPDEST {
                self.close(&frame, start, pc, SegmentExit::Fallthrough)?;
                worklist.push((frame, Some((start, EdgeType::Fallthrough))));
                return Ok(());
            }

            let hit = matcher.observe(self.code, pc);
            let flow = interpreter::step(&mut frame)?;
            let end = frame.pc.min(code_len);

            match flow {
                Flow::Continue => {}
                Flow::Halt(Termination::Happy) => {
                    self.close(&frame, start, end, SegmentExit::Happy)?;
                    return Ok(());
                }
                Flow::Halt(Termination::Sad) => {
                    self.close(&frame, start, end, SegmentExit::Sad)?;
                    return Ok(());
                }
                Flow::Subroutine => {
                    self.close(&frame, start, end, SegmentExit::Subroutine)?;
                    return Ok(());
                }
                Flow::Jump { target } => {
                    let dest = self.resolve(pc, target)?;
                    self.close(&frame, start, end, SegmentExit::Jump)?;
                    worklist.push((frame.branch_to(dest), Some((start, EdgeType::Jump))));
                    return Ok(());
                }
                Flow::Branch { target, condition } => {
                    let dest = self.resolve(pc, target)?;
                    self.close(&frame, start, end, SegmentExit::Branch)?;

                    if let Some(hit) = hit {
                        self.dispatch_sites.push(DispatchSite {
                            hit,
                            segment: start,
                            entry: frame.branch_to(dest),
                        });
                    }

                    let taken = (frame.branch_to(dest), Some((start, EdgeType::BranchTrue)));
                    let not_taken = (frame, Some((start, EdgeType::BranchFalse)));
                    match condition.as_concrete() {
                        Some(value) if value.is_zero() => worklist.push(not_taken),
                        Some(_) => worklist.push(taken),
                        None => {
                            worklist.push(taken);
                            worklist.push(not_taken);
                        }
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Resolves a jump target to a valid destination.
    fn resolve(&self, pc: usize, target: StackValue) -> Result<usize, AnalysisError> {
        let Some(dest) = target.as_usize() else {
            return Err(AnalysisError::DynamicJump { pc });
        };
        if !self.jumps.is_valid(dest) {
            return Err(AnalysisError::InvalidJumpDestination { pc, target: dest });
        }
        Ok(dest)
    }

    /// Records the segment `[start, end)`. A revisit must reproduce the same length and exit.
    fn close(
        &mut self,
        frame: &Frame<'a>,
        start: usize,
        end: usize,
        exit: SegmentExit,
    ) -> Result<(), AnalysisError> {
        self.code_reads.extend(frame.code_reads.iter().copied());

        let length = end - start;
        if length == 0 {
            return Ok(());
        }
        let closed = Closed { length, exit };
        match self.segments.get(&start) {
            Some(existing) if *existing != closed => Err(AnalysisError::internal(format!(
                "segment at pc={start} closed as {closed:?}, previously {existing:?}"
            ))),
            Some(_) => Ok(()),
            None => {
                tracing::debug!(
                    "segment [{}, {}) exits via {:?}",
                    start,
                    end,
                    exit
                );
                self.segments.insert(start, closed);
                Ok(())
            }
        }
    }
}
