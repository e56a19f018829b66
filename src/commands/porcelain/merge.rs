use crate::areas::index::Index;
use crate::areas::pending_commit::{MergeKind, PendingCommitError};
use crate::areas::refs::ORIG_HEAD;
use crate::areas::repository::Repository;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::log::path_filter::PathFilter;
use crate::artifacts::merge::MergeError;
use crate::artifacts::merge::inputs::Inputs;
use crate::artifacts::merge::resolve::Resolve;
use crate::commands::plumbing::write_commit::CommitIdentity;
use anyhow::Context;
use std::io::Write;
use tracing::debug;

impl Repository {
    /// Merge `revision` into `HEAD`.
    ///
    /// Fast-forwards when `HEAD` is an ancestor of the revision. Otherwise the
    /// trees are resolved against the merge base; a clean result is committed
    /// with both parents, a conflicted one is left in the index and workspace
    /// with the merge recorded as pending.
    pub async fn merge(
        &mut self,
        revision: &str,
        message: Option<&str>,
        identity: &CommitIdentity,
    ) -> anyhow::Result<()> {
        if let Some(kind) = self.pending_commit().merge_type() {
            return Err(PendingCommitError::Unconcluded(kind).into());
        }

        let inputs = Inputs::new(self, "HEAD", revision)?;
        if inputs.is_already_merged() {
            writeln!(self.writer(), "Already up to date.")?;
            return Ok(());
        }
        self.refs().update_ref(ORIG_HEAD, inputs.left_oid())?;

        let index = self.index();
        let mut index = index.lock().await;
        index.load_for_update()?;

        if inputs.is_fast_forward() {
            return self.fast_forward(&mut index, &inputs);
        }

        let clean = {
            let mut resolve = Resolve::new(self, &mut index, &inputs);
            let resolved = resolve.execute();
            for line in resolve.messages() {
                writeln!(self.writer(), "{line}")?;
            }
            resolved.map(|_| resolve.is_clean())
        };
        let clean = match clean {
            Ok(clean) => clean,
            Err(err) => {
                index.rollback()?;
                return Err(err);
            }
        };
        index.write_updates()?;

        let message = match message {
            Some(message) => message.to_string(),
            None => format!("Merge branch '{revision}'"),
        };

        if !clean {
            self.pending_commit()
                .start(inputs.right_oid(), MergeKind::Merge, &message)?;
            writeln!(self.writer(), "{}", MergeError::Conflicted)?;
            return Err(MergeError::Conflicted.into());
        }

        let tree_oid = self.write_tree(&index)?;
        let (oid, commit) = self.write_commit(
            vec![inputs.left_oid().clone(), inputs.right_oid().clone()],
            tree_oid,
            identity.author().clone(),
            identity.committer().clone(),
            &message,
        )?;

        self.print_commit_summary(&oid, &commit)
    }

    /// Commit a merge whose conflicts the user has resolved.
    pub async fn merge_continue(&mut self, identity: &CommitIdentity) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;
        index.load()?;

        self.conclude_pending_commit(&index, MergeKind::Merge, None, identity)
    }

    /// Drop a conflicted merge and put back the commit `HEAD` was at before it.
    pub async fn merge_abort(&mut self) -> anyhow::Result<()> {
        if self.pending_commit().merge_type() != Some(MergeKind::Merge) {
            return Err(PendingCommitError::NoMergeToAbort(MergeKind::Merge).into());
        }
        self.pending_commit().clear(MergeKind::Merge)?;

        let orig_head = self
            .refs()
            .read_ref(ORIG_HEAD)?
            .context("ORIG_HEAD is missing, cannot abort the merge")?;

        let index = self.index();
        let mut index = index.lock().await;
        index.load_for_update()?;

        if let Err(err) = self.hard_reset(&mut index, &orig_head) {
            index.rollback()?;
            return Err(err);
        }
        index.write_updates()?;
        self.refs().update_head(&orig_head)?;

        Ok(())
    }

    fn fast_forward(&self, index: &mut Index, inputs: &Inputs) -> anyhow::Result<()> {
        let left = inputs.left_oid();
        let right = inputs.right_oid();

        writeln!(
            self.writer(),
            "Updating {}..{}",
            left.to_short_oid(),
            right.to_short_oid()
        )?;
        writeln!(self.writer(), "Fast-forward")?;

        let tree_diff = self
            .database()
            .tree_diff(Some(left), Some(right), &PathFilter::any())?;
        if let Err(err) = Migration::new(self, index, tree_diff, "merge").apply_changes() {
            index.rollback()?;
            return Err(err);
        }
        index.write_updates()?;
        self.refs().update_head(right)?;
        debug!(from = %left, to = %right, "fast-forward");

        Ok(())
    }
}
