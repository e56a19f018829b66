use crate::areas::index::Index;
use crate::areas::refs::ORIG_HEAD;
use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::RevisionResolver;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::status_info::Status;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ResetMode {
    /// Move `HEAD` only
    Soft,
    /// Move `HEAD` and rebuild the index
    #[default]
    Mixed,
    /// Move `HEAD` and rewrite both the index and the workspace
    Hard,
}

impl Repository {
    /// Reset `HEAD` to a commit, or restore index entries of `paths` from it.
    ///
    /// The first argument is taken as a revision when it resolves to a
    /// commit, otherwise as a path and the target is `HEAD`.
    pub async fn reset(&mut self, args: &[String], mode: ResetMode) -> anyhow::Result<()> {
        let (target_oid, paths) = self.select_reset_target(args)?;

        let index = self.index();
        let mut index = index.lock().await;
        index.load_for_update()?;

        let reset = match (mode, target_oid.as_ref()) {
            (ResetMode::Soft, _) => Ok(()),
            (ResetMode::Hard, Some(oid)) => self.hard_reset(&mut index, oid),
            _ => self.reset_index(&mut index, target_oid.as_ref(), &paths),
        };
        if let Err(err) = reset {
            index.rollback()?;
            return Err(err);
        }
        index.write_updates()?;

        if paths.is_empty()
            && let Some(target_oid) = target_oid
        {
            if let Some(head_oid) = self.refs().read_head()? {
                self.refs().update_ref(ORIG_HEAD, &head_oid)?;
            }
            self.refs().update_head(&target_oid)?;
            debug!(oid = %target_oid, ?mode, "reset HEAD");
        }

        Ok(())
    }

    fn select_reset_target(
        &self,
        args: &[String],
    ) -> anyhow::Result<(Option<ObjectId>, Vec<PathBuf>)> {
        let resolver = RevisionResolver::new(self);

        match args.split_first() {
            Some((first, rest)) => match resolver.resolve_commit(first) {
                Ok(oid) => Ok((Some(oid), rest.iter().map(PathBuf::from).collect())),
                Err(_) => Ok((
                    self.refs().read_head()?,
                    args.iter().map(PathBuf::from).collect(),
                )),
            },
            None => Ok((self.refs().read_head()?, Vec::new())),
        }
    }

    /// Index entries from the target tree: all of them, or only those at
    /// or beneath `paths`.
    fn reset_index(
        &self,
        index: &mut Index,
        target_oid: Option<&ObjectId>,
        paths: &[PathBuf],
    ) -> anyhow::Result<()> {
        let listing = self.database().load_tree_list(target_oid, Path::new(""))?;

        if paths.is_empty() {
            index.clear();
            for (path, entry) in &listing {
                index.add_from_db(path, entry);
            }
            return Ok(());
        }

        for path in paths {
            index.remove(path);
            for (entry_path, entry) in listing.range(path.clone()..) {
                if !entry_path.starts_with(path) {
                    break;
                }
                index.add_from_db(entry_path, entry);
            }
        }

        Ok(())
    }

    /// Rewrite every changed path from the tree of `oid`, dropping any
    /// conflict stages on the way. Untracked files are left alone.
    pub(crate) fn hard_reset(&self, index: &mut Index, oid: &ObjectId) -> anyhow::Result<()> {
        let info = Status::new(self).initialize(index, Some(oid))?;

        for path in &info.changed {
            index.remove(path);
            self.workspace().remove(path)?;

            let Some(entry) = info.head_tree.get(path) else {
                continue;
            };
            let blob = self.database().load_blob(&entry.oid)?;
            self.workspace()
                .write_file(path, blob.content(), Some(entry.mode), true)?;
            let stat = self.workspace().stat_file(path)?;
            index.add(IndexEntry::new(path.clone(), entry.oid.clone(), stat));
        }
        debug!(%oid, changed = info.changed.len(), "hard reset");

        Ok(())
    }
}
