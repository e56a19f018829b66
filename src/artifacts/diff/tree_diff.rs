//! Structural diff of two trees
//!
//! Both trees are walked in lockstep, one directory level at a time. Equal
//! entries are skipped without descending, so unchanged subtrees cost a
//! single comparison. The result only ever names leaves: a directory that
//! replaced a file shows up as the file's deletion plus one addition per
//! file in the directory.

use crate::areas::database::Database;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::log::path_filter::PathFilter;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    Added(DatabaseEntry),
    Deleted(DatabaseEntry),
    Modified {
        old: DatabaseEntry,
        new: DatabaseEntry,
    },
}

impl TreeChange {
    pub fn from_entries(old: Option<DatabaseEntry>, new: Option<DatabaseEntry>) -> Option<Self> {
        match (old, new) {
            (None, Some(new)) => Some(TreeChange::Added(new)),
            (Some(old), None) => Some(TreeChange::Deleted(old)),
            (Some(old), Some(new)) if old != new => Some(TreeChange::Modified { old, new }),
            _ => None,
        }
    }

    pub fn old_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChange::Deleted(entry) | TreeChange::Modified { old: entry, .. } => Some(entry),
            TreeChange::Added(_) => None,
        }
    }

    pub fn new_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChange::Added(entry) | TreeChange::Modified { new: entry, .. } => Some(entry),
            TreeChange::Deleted(_) => None,
        }
    }

    pub fn status_char(&self) -> char {
        match self {
            TreeChange::Added(_) => 'A',
            TreeChange::Deleted(_) => 'D',
            TreeChange::Modified { .. } => 'M',
        }
    }
}

pub type ChangeSet = BTreeMap<PathBuf, TreeChange>;

type TreeEntries = BTreeMap<String, DatabaseEntry>;

#[derive(Debug)]
pub struct TreeDiff<'r> {
    database: &'r Database,
    changes: ChangeSet,
}

impl<'r> TreeDiff<'r> {
    pub fn new(database: &'r Database) -> Self {
        TreeDiff {
            database,
            changes: ChangeSet::new(),
        }
    }

    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }

    /// Compare two trees (or the trees of two commits).
    pub fn compare_oids(
        &mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        filter: &PathFilter,
    ) -> anyhow::Result<()> {
        if old == new {
            return Ok(());
        }

        let old_entries = self.tree_entries(old)?;
        let new_entries = self.tree_entries(new)?;

        self.detect_deletions(&old_entries, &new_entries, filter)?;
        self.detect_additions(&old_entries, &new_entries, filter)?;

        Ok(())
    }

    fn tree_entries(&self, oid: Option<&ObjectId>) -> anyhow::Result<TreeEntries> {
        match oid {
            None => Ok(TreeEntries::new()),
            Some(oid) => Ok(self.database.load_tree_of(oid)?.into_entries().collect()),
        }
    }

    fn detect_deletions(
        &mut self,
        old: &TreeEntries,
        new: &TreeEntries,
        filter: &PathFilter,
    ) -> anyhow::Result<()> {
        for (name, entry) in old.iter().filter(|(name, _)| filter.matches(name)) {
            let other = new.get(name);
            if other == Some(entry) {
                continue;
            }

            let sub_filter = filter.join(name);

            let old_tree = entry.is_tree().then_some(&entry.oid);
            let new_tree = other.filter(|other| other.is_tree()).map(|other| &other.oid);
            self.compare_oids(old_tree, new_tree, &sub_filter)?;

            let old_blob = (!entry.is_tree()).then(|| entry.clone());
            let new_blob = other.filter(|other| !other.is_tree()).cloned();

            if let Some(change) = TreeChange::from_entries(old_blob, new_blob) {
                self.changes.insert(sub_filter.path().to_path_buf(), change);
            }
        }

        Ok(())
    }

    fn detect_additions(
        &mut self,
        old: &TreeEntries,
        new: &TreeEntries,
        filter: &PathFilter,
    ) -> anyhow::Result<()> {
        for (name, entry) in new.iter().filter(|(name, _)| filter.matches(name)) {
            if old.contains_key(name) {
                continue;
            }

            let sub_filter = filter.join(name);

            if entry.is_tree() {
                self.compare_oids(None, Some(&entry.oid), &sub_filter)?;
            } else {
                self.changes.insert(
                    sub_filter.path().to_path_buf(),
                    TreeChange::Added(entry.clone()),
                );
            }
        }

        Ok(())
    }
}
