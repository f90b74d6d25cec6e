use crate::opcode::{op, push_size};

/// A completed `PUSH4 selector [DUPn]* EQ PUSH1|PUSH2 dest JUMPI` match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchHit {
    /// 4-byte function selector compared against the calldata prefix.
    pub selector: u32,
    /// Destination pushed right before the JUMPI.
    pub target: usize,
    /// PC of the JUMPI that closes the comparison.
    pub jumpi_pc: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum MatchState {
    #[default]
    Idle,
    /// `PUSH4 selector` seen, possibly followed by DUPs.
    Selector(u32),
    /// `EQ` seen after the selector.
    Compared(u32),
    /// Destination pushed after the comparison.
    Target(u32, usize),
}

/// Incremental recognizer for solc's selector comparison sequence.
///
/// The matcher is fed one instruction at a time, in execution order, and reports a
/// [`DispatchHit`] when it sees the JUMPI that completes the pattern. Any instruction that does not
/// continue the pattern resets it, except that a PUSH4 always starts a new candidate.
///
/// # Examples
/// ```
/// use sliver_core::detection::DispatchMatcher;
///
/// // PUSH4 0xaabbccdd DUP2 EQ PUSH1 0x20 JUMPI
/// let code = [0x63, 0xaa, 0xbb, 0xcc, 0xdd, 0x81, 0x14, 0x60, 0x20, 0x57];
/// let mut matcher = DispatchMatcher::default();
/// let hits: Vec<_> = [0, 5, 6, 7, 9]
///     .into_iter()
///     .filter_map(|pc| matcher.observe(&code, pc))
///     .collect();
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].selector, 0xaabbccdd);
/// assert_eq!(hits[0].target, 0x20);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DispatchMatcher {
    state: MatchState,
}

impl DispatchMatcher {
    /// Clears any partial match.
    pub fn reset(&mut self) {
        self.state = MatchState::Idle;
    }

    /// Feeds the instruction at `pc` and returns a hit when it completes the pattern.
    pub fn observe(&mut self, code: &[u8], pc: usize) -> Option<DispatchHit> {
        let Some(&byte) = code.get(pc) else {
            self.reset();
            return None;
        };

        let (next, hit) = match (self.state, byte) {
            (_, op::PUSH4) => match read_immediate(code, pc) {
                Some(selector) => (MatchState::Selector(selector as u32), None),
                None => (MatchState::Idle, None),
            },
            (MatchState::Selector(sel), op::DUP1..=op::DUP16) => (MatchState::Selector(sel), None),
            (MatchState::Selector(sel), op::EQ) => (MatchState::Compared(sel), None),
            (MatchState::Compared(sel), op::PUSH1 | op::PUSH2) => match read_immediate(code, pc) {
                Some(target) => (MatchState::Target(sel, target as usize), None),
                None => (MatchState::Idle, None),
            },
            (MatchState::Target(selector, target), op::JUMPI) => (
                MatchState::Idle,
                Some(DispatchHit {
                    selector,
                    target,
                    jumpi_pc: pc,
                }),
            ),
            _ => (MatchState::Idle, None),
        };

        self.state = next;
        if let Some(hit) = hit {
            tracing::debug!(
                "dispatch check for selector {:#010x} -> {:#x} at pc={}",
                hit.selector,
                hit.target,
                pc
            );
        }
        hit
    }
}

/// Reads a PUSH1..PUSH4 immediate in full; truncated immediates never match.
fn read_immediate(code: &[u8], pc: usize) -> Option<u64> {
    let len = push_size(code[pc]);
    let bytes = code.get(pc + 1..pc + 1 + len)?;
    Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}
