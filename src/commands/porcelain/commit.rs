use crate::areas::index::Index;
use crate::areas::pending_commit::{MergeKind, PendingCommitError};
use crate::areas::repository::Repository;
use crate::commands::plumbing::write_commit::CommitIdentity;
use anyhow::Context;

impl Repository {
    /// Commit the index on top of `HEAD`. With a merge or cherry-pick
    /// pending, conclude it instead; the message may then be omitted.
    pub async fn commit(
        &mut self,
        message: Option<&str>,
        identity: &CommitIdentity,
    ) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;
        index.load()?;

        if let Some(kind) = self.pending_commit().merge_type() {
            return self.conclude_pending_commit(&index, kind, message, identity);
        }

        let message = message
            .filter(|message| !message.trim().is_empty())
            .context("Aborting commit due to empty commit message.")?;

        let parents = self.refs().read_head()?.into_iter().collect();
        let tree_oid = self.write_tree(&index)?;
        let (oid, commit) = self.write_commit(
            parents,
            tree_oid,
            identity.author().clone(),
            identity.committer().clone(),
            message,
        )?;

        self.print_commit_summary(&oid, &commit)
    }

    /// Write the commit a stopped merge or cherry-pick was heading for.
    pub(crate) fn conclude_pending_commit(
        &self,
        index: &Index,
        kind: MergeKind,
        message: Option<&str>,
        identity: &CommitIdentity,
    ) -> anyhow::Result<()> {
        if index.has_conflict() {
            return Err(PendingCommitError::UnmergedFiles.into());
        }

        let head_oid = self
            .refs()
            .read_head()?
            .context("cannot conclude a pending commit without HEAD")?;
        let merge_oid = self.pending_commit().merge_oid(kind)?;
        let message = match message {
            Some(message) => message.to_string(),
            None => self.pending_commit().merge_message()?,
        };

        let (parents, author) = match kind {
            MergeKind::Merge => (vec![head_oid, merge_oid], identity.author().clone()),
            MergeKind::CherryPick => {
                let picked = self.database().load_commit(&merge_oid)?;
                (vec![head_oid], picked.author().clone())
            }
        };

        let tree_oid = self.write_tree(index)?;
        let (oid, commit) = self.write_commit(
            parents,
            tree_oid,
            author,
            identity.committer().clone(),
            &message,
        )?;
        self.pending_commit().clear(kind)?;

        self.print_commit_summary(&oid, &commit)
    }
}
