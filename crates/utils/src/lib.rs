//! Shared error types for the sliver workspace.

pub mod errors;
