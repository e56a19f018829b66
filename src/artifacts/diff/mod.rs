//! Diff algorithms and tree comparison
//!
//! - `diff_algorithm`: Myers' diff for line-by-line comparison
//! - `hunk`: grouping of edits into `@@` hunks with context
//! - `diff_target`: one side of a file diff (database, workspace or nothing)
//! - `tree_diff`: tree-level diffing for detecting file changes

pub mod diff_algorithm;
pub mod diff_target;
pub mod hunk;
pub mod tree_diff;
