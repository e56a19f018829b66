//! bit: a content-addressed version control engine
//!
//! The crate is split in three layers:
//!
//! - `areas`: the on-disk areas of a repository (object database, index, refs, workspace)
//! - `artifacts`: the data structures and algorithms operating on those areas
//! - `commands`: plumbing and porcelain command bodies, written as `impl Repository` blocks

pub mod areas;
pub mod artifacts;
pub mod commands;
