use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

/// The ways a workspace can stand in the way of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConflictType {
    /// The file holds local changes
    StaleFile,
    /// An untracked file sits in a directory about to be replaced
    StaleDirectory,
    /// An untracked file sits where a new file goes
    UntrackedOverwritten,
    /// An untracked file sits where a file is about to be removed
    UntrackedRemoved,
}

impl ConflictType {
    pub fn classify(
        stat: Option<&EntryMetadata>,
        entry: Option<&IndexEntry>,
        new_entry: Option<&DatabaseEntry>,
    ) -> ConflictType {
        if entry.is_some() {
            ConflictType::StaleFile
        } else if let Some(stat) = stat
            && stat.is_dir()
        {
            ConflictType::StaleDirectory
        } else if new_entry.is_some() {
            ConflictType::UntrackedOverwritten
        } else {
            ConflictType::UntrackedRemoved
        }
    }

    fn header(&self, operation: &str) -> String {
        match self {
            ConflictType::StaleFile => format!(
                "Your local changes to the following files would be overwritten by {operation}:"
            ),
            ConflictType::StaleDirectory => {
                "Updating the following directories would lose untracked files in them:".to_string()
            }
            ConflictType::UntrackedOverwritten => format!(
                "The following untracked working tree files would be overwritten by {operation}:"
            ),
            ConflictType::UntrackedRemoved => format!(
                "The following untracked working tree files would be removed by {operation}:"
            ),
        }
    }

    fn footer(&self, operation: &str) -> Option<String> {
        let action = match operation {
            "checkout" => "switch branches",
            other => other,
        };

        match self {
            ConflictType::StaleFile => Some(format!(
                "Please commit your changes or stash them before you {action}."
            )),
            ConflictType::StaleDirectory => None,
            ConflictType::UntrackedOverwritten | ConflictType::UntrackedRemoved => Some(format!(
                "Please move or remove them before you {action}."
            )),
        }
    }
}

/// Every path that blocked a migration, grouped by cause.
#[derive(Debug, Error)]
#[error("{}", self.report())]
pub struct MigrationError {
    operation: &'static str,
    conflicts: BTreeMap<ConflictType, BTreeSet<PathBuf>>,
}

impl MigrationError {
    pub fn new(
        operation: &'static str,
        conflicts: BTreeMap<ConflictType, BTreeSet<PathBuf>>,
    ) -> Self {
        MigrationError {
            operation,
            conflicts,
        }
    }

    pub fn conflicts(&self) -> &BTreeMap<ConflictType, BTreeSet<PathBuf>> {
        &self.conflicts
    }

    /// One `error:` block per conflict class, then `Aborting`.
    pub fn report(&self) -> String {
        let mut blocks = Vec::new();

        for (conflict_type, paths) in &self.conflicts {
            if paths.is_empty() {
                continue;
            }

            let mut block = format!("error: {}\n", conflict_type.header(self.operation));
            for path in paths {
                block.push_str(&format!("\t{}\n", path.display()));
            }
            if let Some(footer) = conflict_type.footer(self.operation) {
                block.push_str(&footer);
                block.push('\n');
            }
            blocks.push(block);
        }

        format!("{}Aborting", blocks.join("\n"))
    }
}
