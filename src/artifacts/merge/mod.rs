//! Merging histories
//!
//! - `bca_finder`: best common ancestors of two commits
//! - `inputs`: the two sides of a merge and the base they are merged against
//! - `resolve`: tree-level merge applied to the workspace and index
//! - `diff3`: line-level three-way merge of file contents

pub mod bca_finder;
pub mod diff3;
pub mod inputs;
pub mod resolve;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MergeError {
    /// Conflicts were recorded in the index; the details were already printed.
    #[error("Automatic merge failed; fix conflicts and then commit the result.")]
    Conflicted,
    #[error("could not apply {0}")]
    PickConflicted(String),
    #[error("commit {0} is a merge but no -m option was given.")]
    MergeCommitPick(String),
    #[error("{0} is already in progress")]
    SequenceInProgress(&'static str),
    #[error("no {0} in progress")]
    NoSequence(&'static str),
}
