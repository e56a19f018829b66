use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use derive_new::new;
use std::io::Write;
use tracing::debug;

/// Who a new commit is attributed to. Built by the caller, never read from
/// the environment here.
#[derive(Debug, Clone, new)]
pub struct CommitIdentity {
    author: Author,
    committer: Author,
}

impl CommitIdentity {
    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }
}

impl Repository {
    /// Store the tree of every merged entry in `index` and return its id.
    pub fn write_tree(&self, index: &Index) -> anyhow::Result<ObjectId> {
        let tree = Tree::build(index.entries().filter(|entry| entry.stage == 0))?;
        self.database().store_tree(&tree)
    }

    /// Store a commit of `tree_oid` and move `HEAD` to it.
    pub fn write_commit(
        &self,
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Author,
        committer: Author,
        message: &str,
    ) -> anyhow::Result<(ObjectId, Commit)> {
        let commit = Commit::new(parents, tree_oid, author, committer, normalize_message(message));
        let commit_oid = self.database().store(&commit)?;
        self.refs().update_head(&commit_oid)?;
        debug!(oid = %commit_oid, parents = commit.parents().len(), "wrote commit");

        Ok((commit_oid, commit))
    }

    /// `[<branch> (root-commit) <short>] <subject>`
    pub fn print_commit_summary(&self, oid: &ObjectId, commit: &Commit) -> anyhow::Result<()> {
        let current = self.refs().current_ref()?;
        let branch = if current.is_detached_head() {
            "detached HEAD".to_string()
        } else {
            current.short_name().to_string()
        };
        let root = if commit.parents().is_empty() {
            " (root-commit)"
        } else {
            ""
        };

        writeln!(
            self.writer(),
            "[{branch}{root} {}] {}",
            oid.to_short_oid(),
            commit.short_message()
        )?;

        Ok(())
    }
}

/// Trim surrounding whitespace and end with exactly one newline.
pub fn normalize_message(message: &str) -> String {
    format!("{}\n", message.trim())
}
