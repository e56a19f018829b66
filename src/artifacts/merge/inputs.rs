//! The sides of a merge
//!
//! `left` is always the current `HEAD`, `right` the revision being merged in.
//! When the histories cross more than once there are several best common
//! ancestors; they are folded pairwise into a virtual base commit, each fold
//! being itself a merge against the bases of its two inputs.

use crate::areas::database::Database;
use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::RevisionResolver;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::merge::bca_finder::BCAFinder;
use crate::artifacts::merge::diff3::Diff3;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const HEAD_LABEL: &str = "HEAD";

const VIRTUAL_BASE_MESSAGE: &str = "merged common ancestors";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs {
    left_name: String,
    right_name: String,
    left_oid: ObjectId,
    right_oid: ObjectId,
    base_oids: Vec<ObjectId>,
}

impl Inputs {
    /// Resolve both sides and find their best common ancestors.
    pub fn new(repository: &Repository, left_name: &str, right_name: &str) -> anyhow::Result<Self> {
        let resolver = RevisionResolver::new(repository);
        let left_oid = resolver.resolve_commit(left_name)?;
        let right_oid = resolver.resolve_commit(right_name)?;

        let database = repository.database();
        let base_oids = BCAFinder::new(|oid: &ObjectId| database.load_slim_commit(oid))
            .find_best_common_ancestors(&left_oid, &right_oid)?;

        Ok(Inputs {
            left_name: left_name.to_string(),
            right_name: right_name.to_string(),
            left_oid,
            right_oid,
            base_oids,
        })
    }

    /// Inputs for replaying a single commit: the commit's parent is the
    /// base, the commit itself is the right side.
    pub fn for_pick(
        left_oid: ObjectId,
        right_name: String,
        right_oid: ObjectId,
        base_oid: Option<ObjectId>,
    ) -> Self {
        Inputs {
            left_name: HEAD_LABEL.to_string(),
            right_name,
            left_oid,
            right_oid,
            base_oids: base_oid.into_iter().collect(),
        }
    }

    pub fn left_name(&self) -> &str {
        &self.left_name
    }

    pub fn right_name(&self) -> &str {
        &self.right_name
    }

    pub fn left_oid(&self) -> &ObjectId {
        &self.left_oid
    }

    pub fn right_oid(&self) -> &ObjectId {
        &self.right_oid
    }

    pub fn base_oids(&self) -> &[ObjectId] {
        &self.base_oids
    }

    /// The right side is already reachable from the left.
    pub fn is_already_merged(&self) -> bool {
        self.base_oids == [self.right_oid.clone()]
    }

    /// The left side is an ancestor of the right.
    pub fn is_fast_forward(&self) -> bool {
        self.base_oids == [self.left_oid.clone()]
    }

    /// The single commit (or tree) the two sides are diffed against.
    pub fn merge_base(&self, database: &Database) -> anyhow::Result<Option<ObjectId>> {
        VirtualBase::new(database).fold(&self.base_oids)
    }
}

/// Folds several merge bases into one commit stored in the database but
/// never referenced by any ref.
struct VirtualBase<'d> {
    database: &'d Database,
}

impl<'d> VirtualBase<'d> {
    fn new(database: &'d Database) -> Self {
        VirtualBase { database }
    }

    fn fold(&self, bases: &[ObjectId]) -> anyhow::Result<Option<ObjectId>> {
        let Some((first, rest)) = bases.split_first() else {
            return Ok(None);
        };

        let mut merged = first.clone();
        for next in rest {
            merged = self.merge_commits(&merged, next)?;
        }

        Ok(Some(merged))
    }

    fn merge_commits(&self, left: &ObjectId, right: &ObjectId) -> anyhow::Result<ObjectId> {
        let bases = BCAFinder::new(|oid: &ObjectId| self.database.load_slim_commit(oid))
            .find_best_common_ancestors(left, right)?;
        let base = self.fold(&bases)?;

        let tree_oid = self.merge_trees(base.as_ref(), left, right)?;

        let left_commit = self.database.load_commit(left)?;
        let right_commit = self.database.load_commit(right)?;
        let newer = if left_commit.timestamp() >= right_commit.timestamp() {
            &left_commit
        } else {
            &right_commit
        };

        let commit = Commit::new(
            vec![left.clone(), right.clone()],
            tree_oid,
            newer.author().clone(),
            newer.committer().clone(),
            VIRTUAL_BASE_MESSAGE.to_string(),
        );
        let oid = self.database.store(&commit)?;
        debug!(%left, %right, virtual_base = %oid, "folded merge bases");

        Ok(oid)
    }

    /// Merge the flattened trees path by path. Conflicting contents keep
    /// their markers; a file shadowed by a directory is dropped.
    fn merge_trees(
        &self,
        base: Option<&ObjectId>,
        left: &ObjectId,
        right: &ObjectId,
    ) -> anyhow::Result<ObjectId> {
        let root = Path::new("");
        let base = self.database.load_tree_list(base, root)?;
        let left = self.database.load_tree_list(Some(left), root)?;
        let right = self.database.load_tree_list(Some(right), root)?;

        let paths = base
            .keys()
            .chain(left.keys())
            .chain(right.keys())
            .collect::<BTreeSet<_>>();

        let mut merged = BTreeMap::new();
        for path in paths {
            let entry = self.merge_entry(base.get(path), left.get(path), right.get(path))?;
            if let Some(entry) = entry {
                merged.insert(path.clone(), entry);
            }
        }

        let entries = merged
            .iter()
            .filter(|(path, _)| !shadowed_by_file(path, &merged))
            .map(|(path, entry)| IndexEntry::from_database_entry(path.clone(), entry, 0))
            .collect::<Vec<_>>();

        self.database
            .store_tree(&Tree::build(entries.iter())?)
            .context("could not store the virtual merge base")
    }

    fn merge_entry(
        &self,
        base: Option<&DatabaseEntry>,
        left: Option<&DatabaseEntry>,
        right: Option<&DatabaseEntry>,
    ) -> anyhow::Result<Option<DatabaseEntry>> {
        let (Some(left_entry), Some(right_entry)) = (left, right) else {
            return Ok(match (base, left, right) {
                (Some(base), Some(side), None) | (Some(base), None, Some(side)) if side == base => {
                    None
                }
                (_, side, None) | (_, None, side) => side.cloned(),
                _ => None,
            });
        };

        if left_entry == right_entry || Some(left_entry) == base {
            return Ok(Some(right_entry.clone()));
        }
        if Some(right_entry) == base {
            return Ok(Some(left_entry.clone()));
        }

        let load = |entry: Option<&DatabaseEntry>| -> anyhow::Result<Bytes> {
            match entry {
                Some(entry) => Ok(self.database.load_blob(&entry.oid)?.into_content()),
                None => Ok(Bytes::new()),
            }
        };
        let (o, a, b) = (load(base)?, load(left)?, load(right)?);
        let merged = Diff3::merge(&o, &a, &b).to_bytes(HEAD_LABEL, "merged");
        let oid = self.database.store(&Blob::new(Bytes::from(merged)))?;

        Ok(Some(DatabaseEntry::new(oid, left_entry.mode)))
    }
}

fn shadowed_by_file(path: &Path, merged: &BTreeMap<PathBuf, DatabaseEntry>) -> bool {
    path.ancestors()
        .skip(1)
        .any(|parent| !parent.as_os_str().is_empty() && merged.contains_key(parent))
}
