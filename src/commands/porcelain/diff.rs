use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::diff_algorithm::{DiffAlgorithm, MyersDiff};
use crate::artifacts::diff::diff_target::DiffTarget;
use crate::artifacts::diff::hunk::Hunk;
use crate::artifacts::diff::tree_diff::ChangeSet;
use crate::artifacts::index::index_entry::STAGE_MERGED;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use crate::artifacts::status::status_info::{Status, StatusInfo};
use colored::Colorize;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Index against workspace, or `HEAD` against index when `cached`.
    pub async fn diff(&mut self, cached: bool) -> anyhow::Result<()> {
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

        if cached {
            self.diff_head_index(&info, &index)
        } else {
            self.diff_index_workspace(&info, &index)
        }
    }

    fn diff_index_workspace(&self, info: &StatusInfo, index: &Index) -> anyhow::Result<()> {
        for (path, change) in &info.workspace_changes {
            let Some(entry) = index.entry_for(path, STAGE_MERGED) else {
                continue;
            };
            let a = DiffTarget::from_entry(path, &entry.database_entry(), self.database())?;

            let b = match change {
                WorkspaceChangeType::Modified => {
                    let mode = info
                        .stats
                        .get(path)
                        .map_or(entry.metadata.mode, |stat| stat.mode);
                    DiffTarget::from_file(path, mode, self.workspace())?
                }
                WorkspaceChangeType::Deleted => DiffTarget::from_nothing(path)?,
                _ => continue,
            };

            self.print_diff(&a, &b)?;
        }

        Ok(())
    }

    fn diff_head_index(&self, info: &StatusInfo, index: &Index) -> anyhow::Result<()> {
        for (path, change) in &info.index_changes {
            let head_target = || match info.head_tree.get(path) {
                Some(item) => DiffTarget::from_entry(path, item, self.database()),
                None => DiffTarget::from_nothing(path),
            };
            let index_target = || match index.entry_for(path, STAGE_MERGED) {
                Some(entry) => {
                    DiffTarget::from_entry(path, &entry.database_entry(), self.database())
                }
                None => DiffTarget::from_nothing(path),
            };

            match change {
                IndexChangeType::Added => {
                    self.print_diff(&DiffTarget::from_nothing(path)?, &index_target()?)?
                }
                IndexChangeType::Modified => self.print_diff(&head_target()?, &index_target()?)?,
                IndexChangeType::Deleted => {
                    self.print_diff(&head_target()?, &DiffTarget::from_nothing(path)?)?
                }
                IndexChangeType::None => {}
            }
        }

        Ok(())
    }

    /// Print a full patch for every change of a tree diff.
    pub(crate) fn print_change_set(&self, changes: &ChangeSet) -> anyhow::Result<()> {
        for (path, change) in changes {
            let a = self.tree_diff_target(path, change.old_entry())?;
            let b = self.tree_diff_target(path, change.new_entry())?;
            self.print_diff(&a, &b)?;
        }

        Ok(())
    }

    fn tree_diff_target(
        &self,
        path: &Path,
        entry: Option<&DatabaseEntry>,
    ) -> anyhow::Result<DiffTarget> {
        match entry {
            Some(entry) => DiffTarget::from_entry(path, entry, self.database()),
            None => DiffTarget::from_nothing(path),
        }
    }

    fn print_diff(&self, a: &DiffTarget, b: &DiffTarget) -> anyhow::Result<()> {
        if a.same_as(b) {
            return Ok(());
        }

        let header = format!("diff --git a/{} b/{}", a.path.display(), b.path.display());
        writeln!(self.writer(), "{}", header.bold())?;
        self.print_diff_mode(a, b)?;
        self.print_diff_content(a, b)
    }

    fn print_diff_mode(&self, a: &DiffTarget, b: &DiffTarget) -> anyhow::Result<()> {
        if a.mode.is_none() {
            let line = format!("new file mode {}", b.pretty_mode());
            writeln!(self.writer(), "{}", line.bold())?;
        } else if b.mode.is_none() {
            let line = format!("deleted file mode {}", a.pretty_mode());
            writeln!(self.writer(), "{}", line.bold())?;
        } else if a.mode != b.mode {
            let old = format!("old mode {}", a.pretty_mode());
            let new = format!("new mode {}", b.pretty_mode());
            writeln!(self.writer(), "{}", old.bold())?;
            writeln!(self.writer(), "{}", new.bold())?;
        }

        Ok(())
    }

    fn print_diff_content(&self, a: &DiffTarget, b: &DiffTarget) -> anyhow::Result<()> {
        if a.oid == b.oid {
            return Ok(());
        }

        let mut oid_range = format!("index {}..{}", a.oid.to_short_oid(), b.oid.to_short_oid());
        if a.mode == b.mode {
            oid_range.push_str(&format!(" {}", a.pretty_mode()));
        }

        writeln!(self.writer(), "{}", oid_range.bold())?;
        writeln!(self.writer(), "{}", format!("--- {}", a.diff_path("a")).bold())?;
        writeln!(self.writer(), "{}", format!("+++ {}", b.diff_path("b")).bold())?;

        let (a_lines, b_lines) = (a.lines(), b.lines());
        let edits = MyersDiff::new(&a_lines, &b_lines).diff();
        for hunk in Hunk::filter(&edits) {
            self.print_diff_hunk(&hunk)?;
        }

        Ok(())
    }

    fn print_diff_hunk(&self, hunk: &Hunk<String>) -> anyhow::Result<()> {
        writeln!(self.writer(), "{}", hunk.header().cyan())?;

        for edit in hunk.edits() {
            writeln!(self.writer(), "{edit}")?;
        }

        Ok(())
    }
}
