//! Merge and cherry-pick state that outlives one command
//!
//! A merge or cherry-pick that stops on conflicts leaves the commit it was
//! bringing in under `MERGE_HEAD` or `CHERRY_PICK_HEAD`, and the message it
//! would have used under `MERGE_MSG`. The presence of the head file is what
//! "in progress" means.

use crate::artifacts::core::lockfile::Lockfile;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const MERGE_MSG: &str = "MERGE_MSG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    Merge,
    CherryPick,
}

impl MergeKind {
    pub fn head_file(&self) -> &'static str {
        match self {
            MergeKind::Merge => "MERGE_HEAD",
            MergeKind::CherryPick => "CHERRY_PICK_HEAD",
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            MergeKind::Merge => "merge",
            MergeKind::CherryPick => "cherry-pick",
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PendingCommitError {
    #[error("There is no {} in progress ({} missing).", .0.operation(), .0.head_file())]
    NoMergeInProgress(MergeKind),
    #[error("There is no {} to abort ({} missing).", .0.operation(), .0.head_file())]
    NoMergeToAbort(MergeKind),
    #[error(
        "You have not concluded your {} ({} exists).\n\
        Please, commit your changes before you {}.",
        .0.operation(), .0.head_file(), .0.operation()
    )]
    Unconcluded(MergeKind),
    #[error("Committing is not possible because you have unmerged files.")]
    UnmergedFiles,
}

#[derive(Debug)]
pub struct PendingCommit {
    path: PathBuf,
    message_path: PathBuf,
}

impl PendingCommit {
    pub fn new(git_path: &Path) -> Self {
        PendingCommit {
            path: git_path.to_path_buf(),
            message_path: git_path.join(MERGE_MSG),
        }
    }

    pub fn start(&self, oid: &ObjectId, kind: MergeKind, message: &str) -> anyhow::Result<()> {
        let mut head = Lockfile::acquire(&self.path.join(kind.head_file()))?;
        head.write_bytes(format!("{oid}\n").as_bytes())?;

        let mut message_lock = Lockfile::acquire(&self.message_path)?;
        message_lock.write_bytes(message.as_bytes())?;

        message_lock.commit()?;
        head.commit()?;
        debug!(%oid, ?kind, "pending commit started");

        Ok(())
    }

    pub fn in_progress(&self) -> bool {
        self.merge_type().is_some()
    }

    pub fn merge_type(&self) -> Option<MergeKind> {
        [MergeKind::Merge, MergeKind::CherryPick]
            .into_iter()
            .find(|kind| self.path.join(kind.head_file()).is_file())
    }

    pub fn merge_oid(&self, kind: MergeKind) -> anyhow::Result<ObjectId> {
        let content = std::fs::read_to_string(self.path.join(kind.head_file()))
            .map_err(|_| PendingCommitError::NoMergeInProgress(kind))?;

        ObjectId::try_parse(content.trim().to_string())
    }

    pub fn merge_message(&self) -> anyhow::Result<String> {
        std::fs::read_to_string(&self.message_path)
            .with_context(|| format!("could not read {}", self.message_path.display()))
    }

    pub fn clear(&self, kind: MergeKind) -> anyhow::Result<()> {
        std::fs::remove_file(self.path.join(kind.head_file()))
            .map_err(|_| PendingCommitError::NoMergeInProgress(kind))?;

        match std::fs::remove_file(&self.message_path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => {
                debug!(?kind, "pending commit cleared");
                Ok(())
            }
        }
    }
}
