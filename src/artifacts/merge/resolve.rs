//! Tree-level three-way merge
//!
//! Both sides are diffed against the base. Paths only the right side touched
//! are applied as they are; paths both sides touched are merged entry by
//! entry, running diff3 on the blobs when both changed the content. The
//! resulting diff goes through a [`Migration`] from the left tree, so local
//! changes in the way refuse the merge before anything is written. Conflicts
//! are then recorded as index stages.
//!
//! A file on one side where the other side has a directory cannot share the
//! path, so the file is written next to it as `<path>~<side>` and its stages
//! are recorded under that name.

use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::tree_diff::{ChangeSet, TreeChange};
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::log::path_filter::PathFilter;
use crate::artifacts::merge::diff3::Diff3;
use crate::artifacts::merge::inputs::Inputs;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object_id::ObjectId;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Base, left and right versions of a conflicted path.
pub type ConflictSet = [Option<DatabaseEntry>; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

pub struct Resolve<'r> {
    repository: &'r Repository,
    index: &'r mut Index,
    inputs: &'r Inputs,
    clean_diff: ChangeSet,
    conflicts: BTreeMap<PathBuf, ConflictSet>,
    untracked: BTreeMap<PathBuf, DatabaseEntry>,
    messages: Vec<String>,
}

impl<'r> Resolve<'r> {
    pub fn new(repository: &'r Repository, index: &'r mut Index, inputs: &'r Inputs) -> Self {
        Resolve {
            repository,
            index,
            inputs,
            clean_diff: ChangeSet::new(),
            conflicts: BTreeMap::new(),
            untracked: BTreeMap::new(),
            messages: Vec::new(),
        }
    }

    /// Lines to show the user, in the order they were produced.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn conflicts(&self) -> &BTreeMap<PathBuf, ConflictSet> {
        &self.conflicts
    }

    /// Merge into the workspace and index. A refused migration leaves both
    /// untouched; the caller still owns the index lock.
    pub fn execute(&mut self) -> anyhow::Result<()> {
        self.prepare_tree_diffs()?;

        let clean_diff = std::mem::take(&mut self.clean_diff);
        Migration::new(self.repository, &mut *self.index, clean_diff, "merge").apply_changes()?;

        self.add_conflicts_to_index();
        self.write_untracked_files()?;

        debug!(
            left = %self.inputs.left_oid(),
            right = %self.inputs.right_oid(),
            conflicts = self.conflicts.len(),
            "resolved merge"
        );

        Ok(())
    }

    fn prepare_tree_diffs(&mut self) -> anyhow::Result<()> {
        let database = self.repository.database();
        let base_oid = self.inputs.merge_base(database)?;
        let filter = PathFilter::any();

        let left_diff =
            database.tree_diff(base_oid.as_ref(), Some(self.inputs.left_oid()), &filter)?;
        let right_diff =
            database.tree_diff(base_oid.as_ref(), Some(self.inputs.right_oid()), &filter)?;

        for (path, change) in &right_diff {
            if change.new_entry().is_some() {
                self.file_dir_conflict(path, &left_diff, Side::Left);
            }
            self.same_path_conflict(&left_diff, path, change.old_entry(), change.new_entry())?;
        }

        for (path, change) in &left_diff {
            if change.new_entry().is_some() {
                self.file_dir_conflict(path, &right_diff, Side::Right);
            }
        }

        Ok(())
    }

    fn same_path_conflict(
        &mut self,
        left_diff: &ChangeSet,
        path: &Path,
        base: Option<&DatabaseEntry>,
        right: Option<&DatabaseEntry>,
    ) -> anyhow::Result<()> {
        if self.conflicts.contains_key(path) {
            return Ok(());
        }

        let Some(left_change) = left_diff.get(path) else {
            if let Some(change) = TreeChange::from_entries(base.cloned(), right.cloned()) {
                self.clean_diff.insert(path.to_path_buf(), change);
            }
            return Ok(());
        };

        let left = left_change.new_entry().cloned();
        if left.as_ref() == right {
            return Ok(());
        }

        if left.is_some() && right.is_some() {
            self.log(format!("Auto-merging {}", path.display()));
        }

        let left = left.as_ref();
        let (oid_ok, oid) = self.merge_blobs(
            base.map(|entry| &entry.oid),
            left.map(|entry| &entry.oid),
            right.map(|entry| &entry.oid),
        )?;
        let (mode_ok, mode) = merge_modes(
            base.map(|entry| &entry.mode),
            left.map(|entry| &entry.mode),
            right.map(|entry| &entry.mode),
        );

        let merged = oid.zip(mode).map(|(oid, mode)| DatabaseEntry::new(oid, mode));
        if let Some(change) = TreeChange::from_entries(left.cloned(), merged) {
            self.clean_diff.insert(path.to_path_buf(), change);
        }

        if oid_ok && mode_ok {
            return Ok(());
        }

        let conflict = [base.cloned(), left.cloned(), right.cloned()];
        if !oid_ok {
            self.log_conflict(path, &conflict, None);
        }
        if oid_ok || modes_differ(left, right) {
            self.log(format!("CONFLICT (mode): Merge conflict in {}", path.display()));
        }
        self.conflicts.insert(path.to_path_buf(), conflict);

        Ok(())
    }

    /// Blob ids merge like any other value unless both sides changed the
    /// content, in which case the merged text (markers and all) is stored.
    fn merge_blobs(
        &self,
        base: Option<&ObjectId>,
        left: Option<&ObjectId>,
        right: Option<&ObjectId>,
    ) -> anyhow::Result<(bool, Option<ObjectId>)> {
        if let Some(result) = merge3(base, left, right) {
            return Ok(result);
        }

        let database = self.repository.database();
        let load = |oid: Option<&ObjectId>| -> anyhow::Result<Bytes> {
            match oid {
                Some(oid) => Ok(database.load_blob(oid)?.into_content()),
                None => Ok(Bytes::new()),
            }
        };
        let (o, a, b) = (load(base)?, load(left)?, load(right)?);

        let merge = Diff3::merge(&o, &a, &b);
        let data = merge.to_bytes(self.inputs.left_name(), self.inputs.right_name());
        let oid = database.store(&Blob::new(Bytes::from(data)))?;

        Ok((merge.is_clean(), Some(oid)))
    }

    fn file_dir_conflict(&mut self, path: &Path, diff: &ChangeSet, side: Side) {
        let Some(dirname) = path.parent() else {
            return;
        };

        let mut parents = dirname
            .ancestors()
            .filter(|parent| !parent.as_os_str().is_empty())
            .collect::<Vec<_>>();
        parents.reverse();

        for parent in parents {
            let Some(change) = diff.get(parent) else {
                continue;
            };
            let Some(new_entry) = change.new_entry() else {
                continue;
            };

            let inputs = self.inputs;
            let old_entry = change.old_entry().cloned();
            let (name, conflict) = match side {
                Side::Left => (
                    inputs.left_name(),
                    [old_entry, Some(new_entry.clone()), None],
                ),
                Side::Right => (
                    inputs.right_name(),
                    [old_entry, None, Some(new_entry.clone())],
                ),
            };

            self.clean_diff.remove(parent);
            let rename = PathBuf::from(format!("{}~{}", parent.display(), name));
            self.untracked.insert(rename.clone(), new_entry.clone());

            if !diff.contains_key(path) {
                self.log(format!("Adding {}", path.display()));
            }
            self.log_conflict(parent, &conflict, Some(rename.as_path()));
            self.conflicts.insert(rename, conflict);
        }
    }

    fn add_conflicts_to_index(&mut self) {
        for (path, conflict) in &self.conflicts {
            self.index.add_conflict_set(path, conflict.clone());
        }
    }

    fn write_untracked_files(&self) -> anyhow::Result<()> {
        let database = self.repository.database();

        for (path, entry) in &self.untracked {
            let blob = database.load_blob(&entry.oid)?;
            self.repository
                .workspace()
                .write_file(path, blob.content(), Some(entry.mode), true)?;
        }

        Ok(())
    }

    fn log(&mut self, message: String) {
        debug!(%message, "merge");
        self.messages.push(message);
    }

    fn log_conflict(&mut self, path: &Path, conflict: &ConflictSet, rename: Option<&Path>) {
        let [base, left, right] = conflict;
        let path = path.display();

        let message = match (base, left, right) {
            (base, Some(_), Some(_)) => {
                let kind = if base.is_some() { "content" } else { "add/add" };
                format!("CONFLICT ({kind}): Merge conflict in {path}")
            }
            (Some(_), _, _) if left.is_some() || right.is_some() => {
                let (deleted, modified) = self.branch_names(conflict);
                let rename = rename
                    .map(|rename| format!(" at {}", rename.display()))
                    .unwrap_or_default();
                format!(
                    "CONFLICT (modify/delete): {path} deleted in {deleted} and modified in {modified}. \
                     Version {modified} of {path} left in tree{rename}."
                )
            }
            _ => {
                let kind = if left.is_some() {
                    "file/directory"
                } else {
                    "directory/file"
                };
                let (branch, _) = self.branch_names(conflict);
                let rename = rename
                    .map(|rename| rename.display().to_string())
                    .unwrap_or_default();
                format!(
                    "CONFLICT ({kind}): There is a directory with name {path} in {branch}. \
                     Adding {path} as {rename}"
                )
            }
        };

        self.log(message);
    }

    /// The side that lost the path first, the side that kept it second.
    fn branch_names(&self, conflict: &ConflictSet) -> (String, String) {
        let (left, right) = (
            self.inputs.left_name().to_string(),
            self.inputs.right_name().to_string(),
        );

        if conflict[1].is_some() {
            (right, left)
        } else {
            (left, right)
        }
    }
}

/// The trivial three-way rules; `None` when both sides changed the value
/// differently. The flag is false when one side is missing.
fn merge3<T: PartialEq + Clone>(
    base: Option<&T>,
    left: Option<&T>,
    right: Option<&T>,
) -> Option<(bool, Option<T>)> {
    match (left, right) {
        (None, _) => Some((false, right.cloned())),
        (_, None) => Some((false, left.cloned())),
        (Some(l), Some(r)) if left == base || l == r => Some((true, Some(r.clone()))),
        (Some(l), Some(_)) if right == base => Some((true, Some(l.clone()))),
        _ => None,
    }
}

fn merge_modes(
    base: Option<&EntryMode>,
    left: Option<&EntryMode>,
    right: Option<&EntryMode>,
) -> (bool, Option<EntryMode>) {
    merge3(base, left, right).unwrap_or((false, left.copied()))
}

/// Both sides kept the path but disagree on its mode.
fn modes_differ(left: Option<&DatabaseEntry>, right: Option<&DatabaseEntry>) -> bool {
    matches!((left, right), (Some(left), Some(right)) if left.mode != right.mode)
}
