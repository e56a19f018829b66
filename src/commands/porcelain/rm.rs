use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::areas::workspace::WorkspaceError;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::STAGE_MERGED;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use crate::artifacts::status::inspector::Inspector;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoveError {
    #[error("not removing '{}' recursively without -r", .0.display())]
    NotRecursive(PathBuf),
    #[error("bit rm: '{}': Operation not permitted", .0.display())]
    IsDirectory(PathBuf),
    /// Removing would lose work that exists nowhere else.
    #[error("{}", render_unsafe(.both_changed, .uncommitted, .unstaged))]
    Unsafe {
        both_changed: Vec<PathBuf>,
        uncommitted: Vec<PathBuf>,
        unstaged: Vec<PathBuf>,
    },
}

/// Options of `rm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    /// Only unstage, keeping the workspace file
    pub cached: bool,
    /// Skip the lost-work checks
    pub force: bool,
    pub recursive: bool,
}

impl Repository {
    /// Untrack paths and, unless `cached`, delete them from the workspace.
    /// Every path is checked before any is removed.
    pub async fn rm(&mut self, paths: &[PathBuf], options: RemoveOptions) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;
        index.load_for_update()?;

        let planned = self
            .expand_removals(&index, paths, options)
            .and_then(|paths| {
                self.check_removals(&index, &paths, options)?;
                Ok(paths)
            });
        let paths = match planned {
            Ok(paths) => paths,
            Err(err) => {
                index.rollback()?;
                return Err(err);
            }
        };

        for path in paths {
            index.remove(&path);
            if !options.cached {
                self.workspace().remove(&path)?;
            }
            writeln!(self.writer(), "rm '{}'", path.display())?;
        }

        index.write_updates()
    }

    fn expand_removals(
        &self,
        index: &Index,
        paths: &[PathBuf],
        options: RemoveOptions,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let mut expanded = Vec::new();

        for path in paths {
            if index.tracked_dir(path) {
                if !options.recursive {
                    return Err(RemoveError::NotRecursive(path.clone()).into());
                }
                let mut children = index
                    .entries_under(path)
                    .into_iter()
                    .map(|entry| entry.name.clone())
                    .collect::<Vec<_>>();
                children.dedup();
                expanded.extend(children);
            } else if index.tracked_file(path) {
                expanded.push(path.clone());
            } else {
                return Err(WorkspaceError::NoMatch(path.clone()).into());
            }
        }

        Ok(expanded)
    }

    fn check_removals(
        &self,
        index: &Index,
        paths: &[PathBuf],
        options: RemoveOptions,
    ) -> anyhow::Result<()> {
        if options.force {
            return Ok(());
        }

        let head_oid = self.refs().read_head()?;
        let head_tree: BTreeMap<PathBuf, DatabaseEntry> = self
            .database()
            .load_tree_list(head_oid.as_ref(), Path::new(""))?;
        let inspector = Inspector::new(self);

        let mut both_changed = Vec::new();
        let mut uncommitted = Vec::new();
        let mut unstaged = Vec::new();

        for path in paths {
            let stat = self.workspace().stat_file(path).ok();
            if stat.as_ref().is_some_and(|stat| stat.is_dir()) {
                return Err(RemoveError::IsDirectory(path.clone()).into());
            }

            let entry = index.entry_for(path, STAGE_MERGED);
            let staged = inspector.compare_tree_to_index(head_tree.get(path), entry)
                != IndexChangeType::None;
            let changed = match stat.as_ref() {
                Some(stat) => {
                    inspector.compare_index_to_workspace(entry, Some(stat))?
                        != WorkspaceChangeType::None
                }
                None => false,
            };

            match (staged, changed) {
                (true, true) => both_changed.push(path.clone()),
                (true, false) if !options.cached => uncommitted.push(path.clone()),
                (false, true) if !options.cached => unstaged.push(path.clone()),
                _ => {}
            }
        }

        if both_changed.is_empty() && uncommitted.is_empty() && unstaged.is_empty() {
            return Ok(());
        }

        Err(RemoveError::Unsafe {
            both_changed,
            uncommitted,
            unstaged,
        }
        .into())
    }
}

fn render_unsafe(both_changed: &[PathBuf], uncommitted: &[PathBuf], unstaged: &[PathBuf]) -> String {
    [
        (
            both_changed,
            "staged content different from both the file and the HEAD",
        ),
        (uncommitted, "changes staged in the index"),
        (unstaged, "local modifications"),
    ]
    .into_iter()
    .filter(|(paths, _)| !paths.is_empty())
    .map(|(paths, message)| {
        let files_have = if paths.len() == 1 {
            "file has"
        } else {
            "files have"
        };
        let mut block = format!("error: the following {files_have} {message}:");
        for path in paths {
            block.push_str(&format!("\n    {}", path.display()));
        }
        block
    })
    .collect::<Vec<_>>()
    .join("\n")
}
