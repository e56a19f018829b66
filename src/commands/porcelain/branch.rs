use crate::areas::repository::Repository;
use crate::artifacts::branch::RefError;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::revision::RevisionResolver;
use crate::artifacts::merge::bca_finder::BCAFinder;
use crate::artifacts::objects::object_id::ObjectId;
use colored::Colorize;
use std::io::Write;

impl Repository {
    /// Create `name` at `start_point`, or at `HEAD` when none is given.
    pub fn create_branch(&mut self, name: &str, start_point: Option<&str>) -> anyhow::Result<()> {
        let branch_name = BranchName::try_parse(name)?;

        let start_oid = match start_point {
            Some(start_point) => RevisionResolver::new(self).resolve_commit(start_point)?,
            None => self.refs().read_head()?.ok_or_else(|| {
                RefError::invalid_object("Not a valid object name: 'HEAD'.")
            })?,
        };

        self.refs().create_branch(&branch_name, &start_oid)
    }

    /// List branches, marking the current one with `*`. Verbose output adds
    /// each tip's short id and subject.
    pub fn list_branches(&mut self, verbose: bool) -> anyhow::Result<()> {
        let current = self.refs().current_ref()?;
        let branches = self.refs().list_branches()?;
        let width = branches
            .iter()
            .map(|branch| branch.short_name().len())
            .max()
            .unwrap_or_default();

        for branch in branches {
            let line = if branch == current {
                format!("* {}", format!("{:<width$}", branch.short_name()).green())
            } else {
                format!("  {:<width$}", branch.short_name())
            };

            if !verbose {
                writeln!(self.writer(), "{}", line.trim_end())?;
                continue;
            }

            match self.refs().read_ref(branch.as_ref_path())? {
                Some(oid) => {
                    let commit = self.database().load_commit(&oid)?;
                    writeln!(
                        self.writer(),
                        "{line} {} {}",
                        oid.to_short_oid(),
                        commit.short_message()
                    )?;
                }
                None => writeln!(self.writer(), "{}", line.trim_end())?,
            }
        }

        Ok(())
    }

    /// Delete branches. Without `force`, a branch must be merged into `HEAD`;
    /// the checked-out branch is never deleted.
    pub fn delete_branches(&mut self, names: &[String], force: bool) -> anyhow::Result<()> {
        for name in names {
            let branch_name = BranchName::try_parse(name.as_str())?;

            if self.refs().is_current_branch(&branch_name)? {
                return Err(RefError::invalid_branch(format!(
                    "Cannot delete branch '{branch_name}' checked out at '{}'",
                    self.path().display()
                ))
                .into());
            }

            if !force {
                self.check_branch_merged(&branch_name)?;
            }

            let oid = self.refs().delete_branch(&branch_name)?;
            writeln!(
                self.writer(),
                "Deleted branch {branch_name} (was {}).",
                oid.to_short_oid()
            )?;
        }

        Ok(())
    }

    fn check_branch_merged(&self, branch_name: &BranchName) -> anyhow::Result<()> {
        let Some(branch_oid) = self.refs().read_ref(&format!("refs/heads/{branch_name}"))? else {
            return Err(RefError::invalid_branch(format!("branch '{branch_name}' not found.")).into());
        };
        let Some(head_oid) = self.refs().read_head()? else {
            return Ok(());
        };

        if !self.is_ancestor(&branch_oid, &head_oid)? {
            return Err(RefError::invalid_branch(format!(
                "The branch '{branch_name}' is not fully merged.\n\
                If you are sure you want to delete it, run 'bit branch delete --force {branch_name}'."
            ))
            .into());
        }

        Ok(())
    }

    /// `ancestor` is reachable from `descendant`.
    pub(crate) fn is_ancestor(
        &self,
        ancestor: &ObjectId,
        descendant: &ObjectId,
    ) -> anyhow::Result<bool> {
        let database = self.database();
        let finder = BCAFinder::new(|oid: &ObjectId| database.load_slim_commit(oid));
        let bases = finder.find_best_common_ancestors(ancestor, descendant)?;

        Ok(bases.as_slice() == std::slice::from_ref(ancestor))
    }
}
