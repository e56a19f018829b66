use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::SymRefName;
use crate::artifacts::branch::revision::RevisionResolver;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::log::path_filter::PathFilter;
use crate::artifacts::objects::object_id::ObjectId;
use std::io::Write;

const DETACHMENT_NOTICE: &str = r#"
HEAD now points at a commit instead of a branch. Commits made from here
belong to no branch and are lost once another checkout moves HEAD away.

To keep them, give them a branch first:

    bit branch create <new-branch-name>
"#;

impl Repository {
    /// Move the workspace, index and `HEAD` to `target`. Local changes that
    /// would be lost refuse the whole checkout before anything is written.
    pub async fn checkout(&mut self, target: &str) -> anyhow::Result<()> {
        let current_ref = self.refs().current_ref()?;
        let current_oid = self.refs().read_head()?;
        let target_oid = RevisionResolver::new(self).resolve_commit(target)?;

        let index = self.index();
        let mut index = index.lock().await;
        index.load_for_update()?;

        let tree_diff = self.database().tree_diff(
            current_oid.as_ref(),
            Some(&target_oid),
            &PathFilter::any(),
        )?;

        let migrated =
            Migration::new(self, &mut index, tree_diff, "checkout").apply_changes();
        if let Err(err) = migrated {
            index.rollback()?;
            return Err(err);
        }
        index.write_updates()?;

        self.refs().set_head(target, &target_oid)?;
        let new_ref = self.refs().current_ref()?;

        self.print_previous_head(&current_ref, current_oid.as_ref(), &target_oid)?;
        self.print_detachment_notice(&current_ref, &new_ref, target)?;
        self.print_new_head(&current_ref, &new_ref, &target_oid)?;

        Ok(())
    }

    fn print_previous_head(
        &self,
        current_ref: &SymRefName,
        current_oid: Option<&ObjectId>,
        target_oid: &ObjectId,
    ) -> anyhow::Result<()> {
        if let Some(current_oid) = current_oid
            && current_ref.is_detached_head()
            && current_oid != target_oid
        {
            self.print_head_position("Previous HEAD position was", current_oid)?;
        }

        Ok(())
    }

    fn print_detachment_notice(
        &self,
        current_ref: &SymRefName,
        new_ref: &SymRefName,
        target: &str,
    ) -> anyhow::Result<()> {
        if !current_ref.is_detached_head() && new_ref.is_detached_head() {
            writeln!(self.writer(), "Note: checking out '{target}'.\n{DETACHMENT_NOTICE}")?;
        }

        Ok(())
    }

    fn print_new_head(
        &self,
        current_ref: &SymRefName,
        new_ref: &SymRefName,
        target_oid: &ObjectId,
    ) -> anyhow::Result<()> {
        if new_ref.is_detached_head() {
            self.print_head_position("HEAD is now at", target_oid)?;
        } else if new_ref == current_ref {
            writeln!(self.writer(), "Already on '{}'", new_ref.short_name())?;
        } else {
            writeln!(self.writer(), "Switched to branch '{}'", new_ref.short_name())?;
        }

        Ok(())
    }

    fn print_head_position(&self, message: &str, oid: &ObjectId) -> anyhow::Result<()> {
        let commit = self.database().load_commit(oid)?;
        writeln!(
            self.writer(),
            "{message} {} {}",
            oid.to_short_oid(),
            commit.short_message()
        )?;

        Ok(())
    }
}
