//! Visited-state cache deciding whether a segment entry needs exploring.

use crate::interpreter::{Stack, StackValue};
use crate::opcode::op;
use std::collections::HashMap;

/// Value a widened stack slot takes: dynamic, produced at the segment's JUMPDEST join point.
pub const WIDENED: StackValue = StackValue::Dynamic(op::JUMPDEST);

/// Records the entry stacks each segment start was explored with.
///
/// Two stacks are compatible when they have the same depth and agree on their top `window`
/// slots (all slots when the stack is not deeper than the window). An entry compatible with a
/// recorded one is not explored again. Each segment start admits at most `cap` distinct stacks
/// as they are; past that, an entry is widened: every slot on which the recorded stacks of the
/// same depth disagree becomes [`WIDENED`], and the widened stack is explored once. A depth with
/// no recorded stack is widened in full.
#[derive(Debug, Clone)]
pub struct VisitedStates {
    window: usize,
    cap: usize,
    seen: HashMap<usize, Vec<Stack>>,
}

impl VisitedStates {
    /// Creates an empty cache.
    pub fn new(window: usize, cap: usize) -> Self {
        Self {
            window,
            cap,
            seen: HashMap::new(),
        }
    }

    /// Stack compatibility under the configured window.
    pub fn is_compatible(&self, a: &Stack, b: &Stack) -> bool {
        if a.len() != b.len() {
            return false;
        }
        let skip = a.len().saturating_sub(self.window);
        a.as_slice()[skip..] == b.as_slice()[skip..]
    }

    /// Decides whether the entry `stack` at `pc` needs exploring.
    ///
    /// # Returns
    /// The stack to explore with (either `stack` itself or its widening), or `None` when a
    /// compatible entry was already explored.
    pub fn admit(&mut self, pc: usize, stack: &Stack) -> Option<Stack> {
        let recorded = self.entries(pc);
        if recorded.iter().any(|seen| self.is_compatible(seen, stack)) {
            return None;
        }

        let admitted = if recorded.len() < self.cap {
            stack.clone()
        } else {
            let widened = widen(stack, recorded);
            if recorded.iter().any(|seen| self.is_compatible(seen, &widened)) {
                return None;
            }
            tracing::warn!(
                "segment at pc={} reached {} entry states, widening",
                pc,
                self.cap
            );
            widened
        };

        self.seen.entry(pc).or_default().push(admitted.clone());
        Some(admitted)
    }

    /// Entry stacks recorded for `pc`.
    pub fn entries(&self, pc: usize) -> &[Stack] {
        self.seen.get(&pc).map(Vec::as_slice).unwrap_or_default()
    }

    /// Takes all recorded entries, leaving the cache empty.
    pub fn take(&mut self) -> HashMap<usize, Vec<Stack>> {
        std::mem::take(&mut self.seen)
    }
}

/// Joins `stack` with the recorded stacks of the same depth.
fn widen(stack: &Stack, recorded: &[Stack]) -> Stack {
    let peers: Vec<&[StackValue]> = recorded
        .iter()
        .filter(|seen| seen.len() == stack.len())
        .map(Stack::as_slice)
        .collect();

    stack
        .as_slice()
        .iter()
        .enumerate()
        .map(|(slot, value)| {
            let agreed = !peers.is_empty() && peers.iter().all(|peer| peer[slot] == *value);
            if agreed { *value } else { WIDENED }
        })
        .collect::<Vec<_>>()
        .into()
}
