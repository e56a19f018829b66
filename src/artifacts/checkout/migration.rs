//! Safe application of a tree diff to the workspace and index
//!
//! A migration is planned in full before anything is touched:
//!
//! 1. Every changed path is checked against the index and the workspace
//! 2. Every change is recorded as a create, update or delete, along with the
//!    directories that must appear or may disappear
//! 3. Any blocked path refuses the whole migration, listing all of them
//!
//! Only then are the workspace and the index updated.

use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::checkout::conflict::{ConflictType, MigrationError};
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::tree_diff::{ChangeSet, TreeChange};
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use crate::artifacts::status::inspector::Inspector;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

pub type Action = (PathBuf, Option<DatabaseEntry>);

pub struct Migration<'r> {
    repository: &'r Repository,
    index: &'r mut Index,
    diff: ChangeSet,
    inspector: Inspector<'r>,
    /// Names the command in refusal messages
    operation: &'static str,
    changes: BTreeMap<ActionType, Vec<Action>>,
    conflicts: BTreeMap<ConflictType, BTreeSet<PathBuf>>,
    mkdirs: BTreeSet<PathBuf>,
    rmdirs: BTreeSet<PathBuf>,
}

impl<'r> Migration<'r> {
    pub fn new(
        repository: &'r Repository,
        index: &'r mut Index,
        diff: ChangeSet,
        operation: &'static str,
    ) -> Self {
        Migration {
            repository,
            index,
            diff,
            inspector: Inspector::new(repository),
            operation,
            changes: BTreeMap::new(),
            conflicts: BTreeMap::new(),
            mkdirs: BTreeSet::new(),
            rmdirs: BTreeSet::new(),
        }
    }

    pub fn actions(&self, action: ActionType) -> &[Action] {
        self.changes.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn mkdirs(&self) -> &BTreeSet<PathBuf> {
        &self.mkdirs
    }

    pub fn rmdirs(&self) -> &BTreeSet<PathBuf> {
        &self.rmdirs
    }

    /// Check, then rewrite the workspace and the index. On refusal nothing
    /// has been written and the error is a [`MigrationError`].
    pub fn apply_changes(&mut self) -> anyhow::Result<()> {
        self.plan_changes()?;
        self.repository.workspace().apply_migration(self)?;
        self.update_index()?;

        Ok(())
    }

    fn plan_changes(&mut self) -> anyhow::Result<()> {
        let diff = std::mem::take(&mut self.diff);

        for (path, change) in &diff {
            self.check_for_conflict(path, change)?;
            self.record_change(path, change);
        }
        self.diff = diff;

        debug!(
            operation = self.operation,
            creates = self.actions(ActionType::Create).len(),
            updates = self.actions(ActionType::Update).len(),
            deletes = self.actions(ActionType::Delete).len(),
            "planned migration"
        );

        if self.conflicts.values().any(|paths| !paths.is_empty()) {
            let conflicts = std::mem::take(&mut self.conflicts);
            return Err(MigrationError::new(self.operation, conflicts).into());
        }

        Ok(())
    }

    fn check_for_conflict(&mut self, path: &Path, change: &TreeChange) -> anyhow::Result<()> {
        let old_entry = change.old_entry();
        let new_entry = change.new_entry();
        let entry = self.index.entry_for(path, 0).cloned();
        let entry = entry.as_ref();

        if self.index_differs_from_trees(entry, old_entry, new_entry) {
            self.add_conflict(ConflictType::StaleFile, path);
            return Ok(());
        }

        let stat = self.repository.workspace().stat_file(path).ok();
        let conflict_type = ConflictType::classify(stat.as_ref(), entry, new_entry);

        match stat {
            None => {
                if let Some(parent) = self.untracked_parent(path)? {
                    let blocked = if entry.is_some() { path } else { parent.as_path() };
                    self.add_conflict(conflict_type, blocked);
                }
            }
            Some(stat) if !stat.is_dir() => {
                let change = self
                    .inspector
                    .compare_index_to_workspace(entry, Some(&stat))?;
                if change != WorkspaceChangeType::None {
                    self.add_conflict(conflict_type, path);
                }
            }
            Some(stat) => {
                if self.inspector.is_trackable(path, &stat, &*self.index)? {
                    self.add_conflict(conflict_type, path);
                }
            }
        }

        Ok(())
    }

    /// An untracked file standing where one of `path`'s directories must go.
    fn untracked_parent(&self, path: &Path) -> anyhow::Result<Option<PathBuf>> {
        let Some(dirname) = path.parent() else {
            return Ok(None);
        };

        for parent in dirname.ancestors() {
            if parent.as_os_str().is_empty() {
                continue;
            }

            match self.repository.workspace().stat_file(parent) {
                Ok(stat) if !stat.is_dir() => {
                    if self.inspector.is_trackable(parent, &stat, &*self.index)? {
                        return Ok(Some(parent.to_path_buf()));
                    }
                }
                _ => continue,
            }
        }

        Ok(None)
    }

    /// The index matches neither side of the change.
    fn index_differs_from_trees(
        &self,
        entry: Option<&IndexEntry>,
        old_entry: Option<&DatabaseEntry>,
        new_entry: Option<&DatabaseEntry>,
    ) -> bool {
        self.inspector.compare_tree_to_index(old_entry, entry) != IndexChangeType::None
            && self.inspector.compare_tree_to_index(new_entry, entry) != IndexChangeType::None
    }

    fn add_conflict(&mut self, conflict_type: ConflictType, path: &Path) {
        self.conflicts
            .entry(conflict_type)
            .or_default()
            .insert(path.to_path_buf());
    }

    fn record_change(&mut self, path: &Path, change: &TreeChange) {
        let dirs = path
            .parent()
            .map(|parent| {
                parent
                    .ancestors()
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let (action, entry) = match change {
            TreeChange::Added(new) => {
                self.mkdirs.extend(dirs);
                (ActionType::Create, Some(new.clone()))
            }
            TreeChange::Modified { new, .. } => {
                self.mkdirs.extend(dirs);
                (ActionType::Update, Some(new.clone()))
            }
            TreeChange::Deleted(_) => {
                self.rmdirs.extend(dirs);
                (ActionType::Delete, None)
            }
        };

        self.changes
            .entry(action)
            .or_default()
            .push((path.to_path_buf(), entry));
    }

    fn update_index(&mut self) -> anyhow::Result<()> {
        for (path, _) in self.actions(ActionType::Delete).to_vec() {
            self.index.remove(&path);
        }

        for action in [ActionType::Create, ActionType::Update] {
            for (path, entry) in self.actions(action).to_vec() {
                let Some(entry) = entry else {
                    anyhow::bail!("missing target entry for {}", path.display());
                };
                let stat = self.repository.workspace().stat_file(&path)?;
                self.index.add(IndexEntry::new(path, entry.oid, stat));
            }
        }

        Ok(())
    }

    pub fn load_blob_data(&self, oid: &ObjectId) -> anyhow::Result<Bytes> {
        Ok(self.repository.database().load_blob(oid)?.into_content())
    }
}
