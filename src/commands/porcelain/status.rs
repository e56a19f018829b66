use crate::areas::pending_commit::MergeKind;
use crate::areas::repository::Repository;
use crate::artifacts::status::file_change::FileChangeType;
use crate::artifacts::status::status_info::{Status, StatusInfo};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;

impl Repository {
    /// Print the repository status, refreshing stale index stats on the way.
    pub async fn status(&mut self, porcelain: bool) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;
        index.load_for_update()?;

        let info = match Status::new(self).initialize(&mut index, None) {
            Ok(info) => info,
            Err(err) => {
                index.rollback()?;
                return Err(err);
            }
        };
        index.write_updates()?;

        if porcelain {
            self.print_porcelain_format(&info)
        } else {
            self.print_long_format(&info)
        }
    }

    fn print_porcelain_format(&self, info: &StatusInfo) -> anyhow::Result<()> {
        for path in &info.changed {
            let code = match info.conflicts.get(path) {
                Some(kind) => kind.short_code().to_string(),
                None => info.file_change(path).to_string(),
            };
            writeln!(self.writer(), "{code} {}", path.display())?;
        }

        for path in &info.untracked {
            writeln!(self.writer(), "?? {}", path.display())?;
        }

        Ok(())
    }

    fn print_long_format(&self, info: &StatusInfo) -> anyhow::Result<()> {
        self.print_branch_status()?;
        self.print_pending_commit_status(info)?;

        let staged = info
            .index_changes
            .iter()
            .map(|(path, change)| (path.clone(), Some(FileChangeType::Index(*change))))
            .collect::<Vec<_>>();
        let unmerged = info
            .conflicts
            .iter()
            .map(|(path, kind)| (path.clone(), Some(FileChangeType::Conflict(*kind))))
            .collect::<Vec<_>>();
        let unstaged = info
            .workspace_changes
            .iter()
            .map(|(path, change)| (path.clone(), Some(FileChangeType::Workspace(*change))))
            .collect::<Vec<_>>();
        let untracked = info
            .untracked
            .iter()
            .map(|path| (path.clone(), None))
            .collect::<Vec<_>>();

        self.print_changes("Changes to be committed", &staged)?;
        self.print_changes("Unmerged paths", &unmerged)?;
        self.print_changes("Changes not staged for commit", &unstaged)?;
        self.print_changes("Untracked files", &untracked)?;

        self.print_commit_status(info)
    }

    fn print_branch_status(&self) -> anyhow::Result<()> {
        let current = self.refs().current_ref()?;

        if current.is_detached_head() {
            writeln!(self.writer(), "Not currently on any branch.")?;
        } else {
            writeln!(self.writer(), "On branch {}", current.short_name())?;
        }

        Ok(())
    }

    fn print_pending_commit_status(&self, info: &StatusInfo) -> anyhow::Result<()> {
        let hints = match self.pending_commit().merge_type() {
            None => return Ok(()),
            Some(MergeKind::Merge) if info.conflicts.is_empty() => {
                writeln!(self.writer(), "All conflicts fixed but you are still merging.")?;
                vec!["use 'bit commit' to conclude merge"]
            }
            Some(MergeKind::Merge) => {
                writeln!(self.writer(), "You have unmerged paths.")?;
                vec![
                    "fix conflicts and run 'bit commit'",
                    "use 'bit merge --abort' to abort the merge",
                ]
            }
            Some(MergeKind::CherryPick) => {
                let oid = self.pending_commit().merge_oid(MergeKind::CherryPick)?;
                writeln!(
                    self.writer(),
                    "You are currently cherry-picking commit {}.",
                    oid.to_short_oid()
                )?;
                let resolve_hint = if info.conflicts.is_empty() {
                    "all conflicts fixed: run 'bit cherry-pick --continue'"
                } else {
                    "fix conflicts and run 'bit cherry-pick --continue'"
                };
                vec![
                    resolve_hint,
                    "use 'bit cherry-pick --abort' to cancel the cherry-pick operation",
                ]
            }
        };

        for hint in hints {
            writeln!(self.writer(), "  ({hint})")?;
        }
        writeln!(self.writer())?;

        Ok(())
    }

    fn print_changes(
        &self,
        message: &str,
        changes: &[(PathBuf, Option<FileChangeType>)],
    ) -> anyhow::Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        writeln!(self.writer(), "{message}:")?;
        writeln!(self.writer())?;

        for (path, change) in changes {
            let path = path.display().to_string();
            match change {
                Some(change @ FileChangeType::Index(_)) => {
                    writeln!(self.writer(), "{change}{}", path.green())?
                }
                Some(change) => writeln!(self.writer(), "{change}{}", path.red())?,
                None => writeln!(self.writer(), "{:>8}{}", "", path.red())?,
            }
        }
        writeln!(self.writer())?;

        Ok(())
    }

    fn print_commit_status(&self, info: &StatusInfo) -> anyhow::Result<()> {
        if !info.index_changes.is_empty() {
            return Ok(());
        }

        let summary = if !info.workspace_changes.is_empty() {
            "no changes added to commit"
        } else if !info.untracked.is_empty() {
            "nothing added to commit but untracked files present"
        } else {
            "nothing to commit, working tree clean"
        };
        writeln!(self.writer(), "{summary}")?;

        Ok(())
    }
}
