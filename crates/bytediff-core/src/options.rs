//! Diff session configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for a diff session.
///
/// Only `timeout` and the two trim flags influence the core engine;
/// the match/patch fields are recognized for the sake of collaborators
/// that weight and split patches downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Seconds to spend mapping a diff before giving up (0 for no limit).
    pub timeout: f32,
    /// Cost of an empty edit operation, in edit characters.
    pub edit_cost: i32,
    /// At what point no match is declared (0.0 = perfection, 1.0 = very loose).
    pub match_threshold: f32,
    /// How far to search for a match (0 = exact location, 1000+ = broad).
    pub match_distance: f32,
    /// When deleting a large block, how closely the contents must match
    /// the expected contents (0.0 = perfection, 1.0 = very loose).
    pub patch_delete_threshold: f32,
    /// Chunk size for patch context length.
    pub patch_margin: i32,
    /// Bits in a match word; 0 disables patch splitting.
    pub match_maxbits: i32,
    /// Run an initial line-level pass to identify changed areas.
    /// Slightly faster, slightly less optimal. Not yet wired into the core.
    pub check_lines: bool,
    /// Strip the common prefix before diffing.
    pub trim_common_prefix: bool,
    /// Strip the common suffix before diffing.
    pub trim_common_suffix: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        DiffOptions {
            timeout: 1.0,
            edit_cost: 4,
            match_threshold: 0.5,
            match_distance: 1000.0,
            patch_delete_threshold: 0.5,
            patch_margin: 4,
            match_maxbits: 32,
            check_lines: true,
            trim_common_prefix: true,
            trim_common_suffix: true,
        }
    }
}
