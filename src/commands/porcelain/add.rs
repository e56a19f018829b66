use crate::areas::repository::Repository;
use crate::areas::workspace::WorkspaceError;
use crate::artifacts::index::index_entry::IndexEntry;
use std::path::{Path, PathBuf};
use tracing::debug;

impl Repository {
    /// Stage files, expanding directories. Every path is expanded before
    /// anything is stored, so a bad pathspec leaves the index untouched.
    pub async fn add(&mut self, paths: &[PathBuf]) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;
        index.load_for_update()?;

        let expanded = match self.expand_pathspecs(paths) {
            Ok(expanded) => expanded,
            Err(err) => {
                index.rollback()?;
                return Err(err);
            }
        };

        for path in expanded {
            let staged = self.workspace().parse_blob(&path).and_then(|blob| {
                let stat = self.workspace().stat_file(&path)?;
                let oid = self.database().store(&blob)?;
                Ok(IndexEntry::new(path.clone(), oid, stat))
            });

            match staged {
                Ok(entry) => index.add(entry),
                Err(err) => {
                    index.rollback()?;
                    return Err(err);
                }
            }
        }

        index.write_updates()?;
        debug!(paths = paths.len(), "staged paths");

        Ok(())
    }

    fn expand_pathspecs(&self, paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
        let mut expanded = Vec::new();

        for path in paths {
            let absolute = if path.is_absolute() {
                path.clone()
            } else {
                std::env::current_dir()?.join(path)
            };
            let absolute = absolute
                .canonicalize()
                .map_err(|_| WorkspaceError::NoMatch(path.clone()))?;
            let relative = absolute
                .strip_prefix(self.path())
                .map_err(|_| WorkspaceError::NoMatch(path.clone()))?;

            let root = if relative.as_os_str().is_empty() {
                None
            } else {
                Some(Path::new(relative))
            };
            expanded.extend(self.workspace().list_files(root)?);
        }

        Ok(expanded)
    }
}
