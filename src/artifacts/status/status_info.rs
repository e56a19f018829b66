//! One status snapshot of a repository
//!
//! Three views are compared: the workspace against the index, and the index
//! against the tree of a commit (`HEAD` unless told otherwise). Conflicted
//! paths are kept apart from both, classified by the stages they carry.
//! Entries whose stat changed but whose content did not get their cached
//! stat refreshed in the index as a side effect.

use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{
    EntryMetadata, IndexEntry, STAGE_BASE, STAGE_MERGED, STAGE_OURS, STAGE_THEIRS,
};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::file_change::{
    ConflictKind, FileChange, IndexChangeType, WorkspaceChangeType,
};
use crate::artifacts::status::inspector::Inspector;
use derive_new::new;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

pub type FileStatSet = BTreeMap<PathBuf, EntryMetadata>;
pub type HeadTree = BTreeMap<PathBuf, DatabaseEntry>;

#[derive(Debug, Clone, Default)]
pub struct StatusInfo {
    pub changed: BTreeSet<PathBuf>,
    pub index_changes: BTreeMap<PathBuf, IndexChangeType>,
    pub workspace_changes: BTreeMap<PathBuf, WorkspaceChangeType>,
    pub conflicts: BTreeMap<PathBuf, ConflictKind>,
    /// Untracked directories end with a separator.
    pub untracked: BTreeSet<PathBuf>,
    pub stats: FileStatSet,
    pub head_tree: HeadTree,
}

impl StatusInfo {
    pub fn file_change(&self, path: &Path) -> FileChange {
        FileChange {
            index_change: self.index_changes.get(path).copied().unwrap_or_default(),
            workspace_change: self
                .workspace_changes
                .get(path)
                .copied()
                .unwrap_or_default(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.changed.is_empty() && self.untracked.is_empty()
    }
}

#[derive(new)]
pub struct Status<'r> {
    repository: &'r Repository,
}

impl<'r> Status<'r> {
    /// Compare against `commit_oid`, or `HEAD` when none is given.
    pub fn initialize(
        &self,
        index: &mut Index,
        commit_oid: Option<&ObjectId>,
    ) -> anyhow::Result<StatusInfo> {
        let inspector = Inspector::new(self.repository);
        let mut info = StatusInfo::default();

        let head_oid = match commit_oid {
            Some(oid) => Some(oid.clone()),
            None => self.repository.refs().read_head()?,
        };
        info.head_tree = self
            .repository
            .database()
            .load_tree_list(head_oid.as_ref(), Path::new(""))?;

        self.scan_workspace(None, index, &inspector, &mut info)?;
        self.check_index_entries(index, &inspector, &mut info)?;
        self.collect_deleted_head_files(index, &mut info);

        debug!(
            changed = info.changed.len(),
            untracked = info.untracked.len(),
            conflicts = info.conflicts.len(),
            "status"
        );

        Ok(info)
    }

    fn scan_workspace(
        &self,
        prefix: Option<&Path>,
        index: &Index,
        inspector: &Inspector<'_>,
        info: &mut StatusInfo,
    ) -> anyhow::Result<()> {
        for (path, stat) in self.repository.workspace().list_dir(prefix)? {
            if index.tracked(&path) {
                if stat.is_dir() {
                    self.scan_workspace(Some(&path), index, inspector, info)?;
                } else {
                    info.stats.insert(path, stat);
                }
            } else if inspector.is_trackable(&path, &stat, index)? {
                let mut path = path;
                if stat.is_dir() {
                    path.push("");
                }
                info.untracked.insert(path);
            }
        }

        Ok(())
    }

    fn check_index_entries(
        &self,
        index: &mut Index,
        inspector: &Inspector<'_>,
        info: &mut StatusInfo,
    ) -> anyhow::Result<()> {
        let entries = index.entries().cloned().collect::<Vec<_>>();
        let mut stages = BTreeMap::<PathBuf, [bool; 3]>::new();

        for entry in entries {
            if entry.stage == STAGE_MERGED {
                self.check_index_against_workspace(&entry, index, inspector, info)?;
                self.check_index_against_head_tree(&entry, inspector, info);
            } else {
                info.changed.insert(entry.name.clone());
                let present = stages.entry(entry.name.clone()).or_default();
                match entry.stage {
                    STAGE_BASE => present[0] = true,
                    STAGE_OURS => present[1] = true,
                    STAGE_THEIRS => present[2] = true,
                    _ => {}
                }
            }
        }

        for (path, [base, ours, theirs]) in stages {
            if let Some(kind) = ConflictKind::from_stages(base, ours, theirs) {
                info.conflicts.insert(path, kind);
            }
        }

        Ok(())
    }

    fn check_index_against_workspace(
        &self,
        entry: &IndexEntry,
        index: &mut Index,
        inspector: &Inspector<'_>,
        info: &mut StatusInfo,
    ) -> anyhow::Result<()> {
        let stat = info.stats.get(&entry.name);
        let change = inspector.compare_index_to_workspace(Some(entry), stat)?;

        if change != WorkspaceChangeType::None {
            info.changed.insert(entry.name.clone());
            info.workspace_changes.insert(entry.name.clone(), change);
        } else if let Some(stat) = stat
            && !entry.times_match(stat)
        {
            index.update_entry_stat(entry, stat);
        }

        Ok(())
    }

    fn check_index_against_head_tree(
        &self,
        entry: &IndexEntry,
        inspector: &Inspector<'_>,
        info: &mut StatusInfo,
    ) {
        let item = info.head_tree.get(&entry.name);
        let change = inspector.compare_tree_to_index(item, Some(entry));

        if change != IndexChangeType::None {
            info.changed.insert(entry.name.clone());
            info.index_changes.insert(entry.name.clone(), change);
        }
    }

    fn collect_deleted_head_files(&self, index: &Index, info: &mut StatusInfo) {
        let deleted = info
            .head_tree
            .keys()
            .filter(|path| !index.tracked_file(path))
            .cloned()
            .collect::<Vec<_>>();

        for path in deleted {
            info.changed.insert(path.clone());
            info.index_changes.insert(path, IndexChangeType::Deleted);
        }
    }
}
