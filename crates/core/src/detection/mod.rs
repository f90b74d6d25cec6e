/// Module for locating structural boundaries in solc-generated runtime bytecode.
///
/// The heuristics here work on raw bytes without executing anything: they recognize the
/// compiler's free-memory-pointer preamble, collect the valid JUMPDEST set, find the end of the
/// selector dispatch block and the INVALID byte that separates executable code from appended
/// data. The [`DispatchMatcher`] recognizes individual selector comparisons and is driven by the
/// path discovery in [`crate::cfg_ir`].
///
/// # Usage
/// ```rust,ignore
/// use sliver_core::detection::{detect_boundaries, looks_like_known_preamble, valid_jump_destinations};
///
/// if looks_like_known_preamble(&code) {
///     let boundaries = detect_boundaries(&code).ok_or(AnalysisError::SelectorBlockNotFound)?;
///     let jumps = valid_jump_destinations(&code, boundaries.code_end);
/// }
/// ```
pub mod dispatcher;
pub mod sections;

pub use dispatcher::{DispatchHit, DispatchMatcher};
pub use sections::{
    CodeBoundaries, JumpTable, detect_boundaries, detect_code_end, looks_like_known_preamble,
    valid_jump_destinations,
};
