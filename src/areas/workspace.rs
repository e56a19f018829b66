use crate::artifacts::checkout::migration::{ActionType, Migration};
use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::objects::blob::Blob;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::trace;
use walkdir::WalkDir;

const IGNORED_PATHS: [&str; 3] = [".git", ".", ".."];

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkspaceError {
    #[error("pathspec '{}' did not match any files", .0.display())]
    NoMatch(PathBuf),
    #[error("open('{}'): Permission denied", .0.display())]
    PermissionDenied(PathBuf),
    #[error("'{}' already exists", .0.display())]
    AlreadyExists(PathBuf),
}

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parse_blob(&self, path: &Path) -> anyhow::Result<Blob> {
        let data = self.read_file(path)?;
        Ok(Blob::new(data))
    }

    /// Non-recursive listing of `dir_path` (the root when `None`), mapping
    /// each relative path to its stat.
    pub fn list_dir(
        &self,
        dir_path: Option<&Path>,
    ) -> anyhow::Result<BTreeMap<PathBuf, EntryMetadata>> {
        let relative = dir_path.unwrap_or(Path::new(""));
        let absolute = self.path.join(relative);

        let read_dir = std::fs::read_dir(&absolute).map_err(|err| match err.kind() {
            io::ErrorKind::PermissionDenied => {
                anyhow::Error::new(WorkspaceError::PermissionDenied(relative.to_path_buf()))
            }
            _ => anyhow::Error::new(err)
                .context(format!("could not list directory {}", absolute.display())),
        })?;

        let mut stats = BTreeMap::new();
        for entry in read_dir {
            let entry = entry?;
            let name = entry.file_name();
            if IGNORED_PATHS.contains(&name.to_string_lossy().as_ref()) {
                continue;
            }

            let path = relative.join(&name);
            if let Ok(stat) = self.stat_file(&path) {
                stats.insert(path, stat);
            }
        }

        Ok(stats)
    }

    /// Every regular file under `root_file_path`, relative to the workspace
    /// root. A file path lists itself.
    pub fn list_files(&self, root_file_path: Option<&Path>) -> anyhow::Result<Vec<PathBuf>> {
        let relative = match root_file_path {
            Some(path) => self.relative_path(path),
            None => PathBuf::new(),
        };
        let absolute = self.path.join(&relative);

        if std::fs::symlink_metadata(&absolute).is_err() {
            return Err(WorkspaceError::NoMatch(relative).into());
        }

        if !absolute.is_dir() {
            return Ok(vec![relative]);
        }

        let files = WalkDir::new(&absolute)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !Self::is_ignored(entry.file_name().to_string_lossy().as_ref()))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(self.path.as_ref())
                    .ok()
                    .map(Path::to_path_buf)
            })
            .collect::<Vec<_>>();

        Ok(files)
    }

    fn is_ignored(name: &str) -> bool {
        IGNORED_PATHS.contains(&name)
    }

    /// Strip the workspace root from absolute paths; relative ones pass through.
    fn relative_path(&self, path: &Path) -> PathBuf {
        let path = if path.is_absolute() {
            path.strip_prefix(self.path.as_ref())
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf())
        } else {
            path.to_path_buf()
        };

        path.components()
            .filter(|component| !matches!(component, std::path::Component::CurDir))
            .collect()
    }

    pub fn read_file(&self, file_path: &Path) -> anyhow::Result<Bytes> {
        let content = std::fs::read(self.path.join(file_path)).map_err(|err| {
            Self::map_io_error(err, file_path, "could not read")
        })?;

        Ok(Bytes::from(content))
    }

    pub fn stat_file(&self, file_path: &Path) -> anyhow::Result<EntryMetadata> {
        let absolute = self.path.join(file_path);
        let metadata = std::fs::metadata(&absolute)
            .map_err(|err| Self::map_io_error(err, file_path, "could not stat"))?;

        (absolute.as_path(), metadata).try_into()
    }

    pub fn exists(&self, file_path: &Path) -> bool {
        std::fs::symlink_metadata(self.path.join(file_path)).is_ok()
    }

    fn map_io_error(err: io::Error, file_path: &Path, action: &str) -> anyhow::Error {
        match err.kind() {
            io::ErrorKind::PermissionDenied => {
                WorkspaceError::PermissionDenied(file_path.to_path_buf()).into()
            }
            _ => anyhow::Error::new(err).context(format!("{action} {}", file_path.display())),
        }
    }

    /// Materialize a file, creating its parent directories. Fails when the
    /// file exists and `overwrite` is false.
    pub fn write_file(
        &self,
        file_path: &Path,
        data: &[u8],
        mode: Option<EntryMode>,
        overwrite: bool,
    ) -> anyhow::Result<()> {
        let path = self.path.join(file_path);

        if !overwrite && path.exists() {
            return Err(WorkspaceError::AlreadyExists(file_path.to_path_buf()).into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for {:?}", file_path))?;
        }
        if path.is_dir() {
            std::fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove existing directory: {:?}", file_path))?;
        }

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("Failed to open file: {:?}", file_path))?;
        file.write_all(data)
            .with_context(|| format!("Failed to write to file: {:?}", file_path))?;

        if let Some(mode) = mode {
            self.set_mode(file_path, mode)?;
        }

        Ok(())
    }

    /// Remove a file or a whole subtree; a missing path is not an error.
    pub fn remove(&self, file_path: &Path) -> anyhow::Result<()> {
        let path = self.path.join(file_path);

        let result = match std::fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_dir() => std::fs::remove_dir_all(&path),
            Ok(_) => std::fs::remove_file(&path),
            Err(err) => Err(err),
        };

        match result {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(anyhow::Error::new(err)
                .context(format!("Failed to remove {:?}", file_path))),
            _ => Ok(()),
        }
    }

    /// Deletes first, then empty directories deepest first, then new
    /// directories shallowest first, then updated and created files.
    pub fn apply_migration(&self, migration: &Migration) -> anyhow::Result<()> {
        self.apply_migration_action_set(migration, ActionType::Delete)?;

        for dir_path in migration.rmdirs().iter().rev() {
            self.remove_directory(dir_path)?;
        }

        for dir_path in migration.mkdirs() {
            self.make_directory(dir_path)?;
        }

        self.apply_migration_action_set(migration, ActionType::Update)?;
        self.apply_migration_action_set(migration, ActionType::Create)?;

        Ok(())
    }

    fn apply_migration_action_set(
        &self,
        migration: &Migration,
        action: ActionType,
    ) -> anyhow::Result<()> {
        for (file_path, entry) in migration.actions(action) {
            trace!(path = %file_path.display(), ?action, "applying change");
            self.remove(file_path)?;

            match (action, entry) {
                (ActionType::Delete, _) => {}
                (ActionType::Create | ActionType::Update, Some(entry)) => {
                    let data = migration.load_blob_data(&entry.oid)?;
                    self.write_file(file_path, &data, Some(entry.mode), true)?;
                }
                (_, None) => anyhow::bail!("missing target entry for {:?}", file_path),
            }
        }

        Ok(())
    }

    fn set_mode(&self, file_path: &Path, mode: EntryMode) -> anyhow::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = match FileMode::try_from(mode)? {
                FileMode::Executable => std::fs::Permissions::from_mode(0o755),
                FileMode::Regular => std::fs::Permissions::from_mode(0o644),
            };
            std::fs::set_permissions(self.path.join(file_path), permissions)
                .with_context(|| format!("Failed to set permissions for file: {:?}", file_path))?;
        }
        #[cfg(not(unix))]
        let _ = (file_path, FileMode::try_from(mode)?);

        Ok(())
    }

    /// Remove a directory if it is empty; anything else is left alone.
    fn remove_directory(&self, dir_path: &Path) -> anyhow::Result<()> {
        match std::fs::remove_dir(self.path.join(dir_path)) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::NotFound
                        | io::ErrorKind::DirectoryNotEmpty
                        | io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(())
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("Failed to remove directory {:?}", dir_path))),
        }
    }

    fn make_directory(&self, dir_path: &Path) -> anyhow::Result<()> {
        let dir_path = self.path.join(dir_path);

        match std::fs::symlink_metadata(&dir_path) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => {
                std::fs::remove_file(&dir_path)?;
                std::fs::create_dir(&dir_path)?;
                Ok(())
            }
            Err(_) => {
                std::fs::create_dir_all(&dir_path)?;
                Ok(())
            }
        }
    }
}
