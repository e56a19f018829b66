use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::pending_commit::PendingCommit;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use anyhow::Context;
use std::cell::{RefCell, RefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const GIT_DIR: &str = ".git";

/// The areas of one repository plus the sink command output goes to.
pub struct Repository {
    path: Box<Path>,
    git_path: PathBuf,
    writer: RefCell<Box<dyn std::io::Write>>,
    index: Arc<Mutex<Index>>,
    database: Database,
    workspace: Workspace,
    refs: Refs,
    pending_commit: PendingCommit,
}

impl Repository {
    pub fn new(path: &Path, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        if !path.exists() {
            std::fs::create_dir_all(path)
                .with_context(|| format!("could not create {}", path.display()))?;
        }
        let path = path
            .canonicalize()
            .with_context(|| format!("could not resolve {}", path.display()))?;
        let git_path = path.join(GIT_DIR);

        Ok(Repository {
            index: Arc::new(Mutex::new(Index::new(
                git_path.join("index").into_boxed_path(),
            ))),
            database: Database::new(git_path.join("objects")),
            workspace: Workspace::new(path.clone().into_boxed_path()),
            refs: Refs::new(git_path.clone()),
            pending_commit: PendingCommit::new(&git_path),
            writer: RefCell::new(writer),
            path: path.into_boxed_path(),
            git_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_path(&self) -> &Path {
        &self.git_path
    }

    /// Fails unless `init` already ran here.
    pub fn ensure_initialized(&self) -> anyhow::Result<()> {
        if !self.git_path.join("HEAD").is_file() {
            anyhow::bail!(RepositoryError::NotARepository(self.path.to_path_buf()));
        }

        Ok(())
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn index(&self) -> Arc<Mutex<Index>> {
        self.index.clone()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn pending_commit(&self) -> &PendingCommit {
        &self.pending_commit
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RepositoryError {
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),
}
