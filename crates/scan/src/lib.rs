//! bytediff-scan - Byte scanning primitives for bytediff
//!
//! Small, allocation-free helpers over `&[u8]` used by the diff engine:
//! shared affix measurement, boundary containment tests, substring search,
//! and byte escaping for debug output.

pub mod affix;
pub mod escape;
pub mod search;

// Re-exports for convenience
pub use affix::{common_prefix, common_suffix, has_prefix, has_suffix};
pub use escape::escape_bytes;
pub use search::find;
