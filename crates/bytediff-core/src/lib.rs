//! Core diff engine for bytediff-rs.
//!
//! Computes a minimal edit script (Delete/Equal/Insert hunks) between two
//! byte sequences with the Myers O(ND) bisect algorithm, built on an
//! index-stable node pool so script surgery never reallocates per node.

pub mod diff;
pub mod options;
pub mod pool;

pub use diff::{Diff, DiffError, Hunk, Hunks};
pub use options::DiffOptions;
pub use pool::{At, DiffOp, NodePool, Range, Source, Span};

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
