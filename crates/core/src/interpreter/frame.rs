//! Execution frames and the bounded symbolic operand stack.

use super::value::StackValue;
use sliver_utils::errors::AnalysisError;

/// Maximum operand stack depth enforced by the EVM.
pub const STACK_LIMIT: usize = 1024;

/// Bounded symbolic operand stack. The top of the stack is the last element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Stack {
    items: Vec<StackValue>,
}

impl Stack {
    /// Creates an empty stack.
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Current depth.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the stack holds no values.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bottom-to-top view of the stack.
    pub fn as_slice(&self) -> &[StackValue] {
        &self.items
    }

    /// Pushes a value, failing at the 1024-entry limit.
    pub fn push(&mut self, value: StackValue, pc: usize) -> Result<(), AnalysisError> {
        if self.items.len() >= STACK_LIMIT {
            return Err(AnalysisError::StackOverflow { pc });
        }
        self.items.push(value);
        Ok(())
    }

    /// Pops the top value.
    pub fn pop(&mut self, pc: usize) -> Result<StackValue, AnalysisError> {
        self.items.pop().ok_or(AnalysisError::StackUnderflow { pc })
    }

    /// Pops `n` values, returned top-first.
    pub fn pop_n(&mut self, n: usize, pc: usize) -> Result<Vec<StackValue>, AnalysisError> {
        if self.items.len() < n {
            return Err(AnalysisError::StackUnderflow { pc });
        }
        let mut popped = self.items.split_off(self.items.len() - n);
        popped.reverse();
        Ok(popped)
    }

    /// Duplicates the `n`-th value from the top (1-based).
    pub fn dup(&mut self, n: usize, pc: usize) -> Result<(), AnalysisError> {
        let len = self.items.len();
        if n == 0 || len < n {
            return Err(AnalysisError::StackUnderflow { pc });
        }
        let value = self.items[len - n];
        self.push(value, pc)
    }

    /// Swaps the top with the `n`-th value below it (1-based).
    pub fn swap(&mut self, n: usize, pc: usize) -> Result<(), AnalysisError> {
        let len = self.items.len();
        if n == 0 || len <= n {
            return Err(AnalysisError::StackUnderflow { pc });
        }
        self.items.swap(len - 1, len - 1 - n);
        Ok(())
    }
}

impl From<Vec<StackValue>> for Stack {
    fn from(items: Vec<StackValue>) -> Self {
        Self { items }
    }
}

/// The symbolic machine state for one path through the bytecode.
///
/// Cloning a frame deep-copies the stack and shares the bytecode.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    /// Program counter of the next instruction.
    pub pc: usize,
    /// Symbolic operand stack.
    pub stack: Stack,
    /// Subroutine return stack depth.
    pub depth: usize,
    /// Concrete `(offset, length)` code ranges read by CODECOPY along this path.
    pub code_reads: Vec<(usize, usize)>,
    code: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Fresh frame at PC 0 with an empty stack.
    pub const fn new(code: &'a [u8]) -> Self {
        Self {
            pc: 0,
            stack: Stack::new(),
            depth: 0,
            code_reads: Vec::new(),
            code,
        }
    }

    /// The bytecode this frame executes.
    pub const fn code(&self) -> &'a [u8] {
        self.code
    }

    /// Clones the frame and moves the copy to `pc`.
    pub fn branch_to(&self, pc: usize) -> Self {
        let mut next = self.clone();
        next.pc = pc;
        next
    }
}
