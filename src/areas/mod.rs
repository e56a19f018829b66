//! Everything a repository keeps on disk
//!
//! Each area owns its part of `.git` (or the working tree, for
//! `workspace`) and is reached through [`repository::Repository`]. Writes go
//! through lock files, so an interrupted command leaves the previous state
//! in place.
//!
//! `pending_commit` and `sequencer` hold the state of a merge or cherry-pick
//! that stopped on conflicts.

pub mod database;
pub mod index;
pub mod pending_commit;
pub mod refs;
pub mod repository;
pub mod sequencer;
pub mod workspace;
