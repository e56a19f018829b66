//! Command bodies
//!
//! - `plumbing`: object-level commands (cat-file, hash-object, ls-tree) and
//!   the tree/commit writers the porcelain builds on
//! - `porcelain`: the workflows a user runs day to day

pub mod plumbing;
pub mod porcelain;
