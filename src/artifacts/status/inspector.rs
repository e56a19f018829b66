use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::objects::object::Object;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use derive_new::new;
use std::path::Path;

/// Pairwise comparisons between the workspace, the index and a tree.
#[derive(new)]
pub struct Inspector<'r> {
    repository: &'r Repository,
}

impl<'r> Inspector<'r> {
    /// A file is trackable when the index doesn't know it; a directory when
    /// anything beneath it is.
    pub fn is_trackable(
        &self,
        path: &Path,
        stat: &EntryMetadata,
        index: &Index,
    ) -> anyhow::Result<bool> {
        if !stat.is_dir() {
            return Ok(!index.tracked_file(path));
        }

        let children = self.repository.workspace().list_dir(Some(path))?;
        let (files, dirs): (Vec<_>, Vec<_>) =
            children.iter().partition(|(_, stat)| !stat.is_dir());

        for (child, child_stat) in files.into_iter().chain(dirs) {
            if self.is_trackable(child, child_stat, index)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Stat first; when size and mode agree but the times don't, hash the
    /// file to tell a touch from an edit.
    pub fn compare_index_to_workspace(
        &self,
        entry: Option<&IndexEntry>,
        stat: Option<&EntryMetadata>,
    ) -> anyhow::Result<WorkspaceChangeType> {
        let (entry, stat) = match (entry, stat) {
            (None, _) => return Ok(WorkspaceChangeType::Untracked),
            (Some(_), None) => return Ok(WorkspaceChangeType::Deleted),
            (Some(entry), Some(stat)) => (entry, stat),
        };

        if !entry.stat_match(stat) {
            return Ok(WorkspaceChangeType::Modified);
        }
        if entry.times_match(stat) {
            return Ok(WorkspaceChangeType::None);
        }

        let oid = self
            .repository
            .workspace()
            .parse_blob(&entry.name)?
            .object_id()?;

        if oid == entry.oid {
            Ok(WorkspaceChangeType::None)
        } else {
            Ok(WorkspaceChangeType::Modified)
        }
    }

    pub fn compare_tree_to_index(
        &self,
        item: Option<&DatabaseEntry>,
        entry: Option<&IndexEntry>,
    ) -> IndexChangeType {
        match (item, entry) {
            (None, None) => IndexChangeType::None,
            (None, Some(_)) => IndexChangeType::Added,
            (Some(_), None) => IndexChangeType::Deleted,
            (Some(item), Some(entry))
                if item.mode != entry.metadata.mode || item.oid != entry.oid =>
            {
                IndexChangeType::Modified
            }
            _ => IndexChangeType::None,
        }
    }
}
