//! References
//!
//! `HEAD` and every file under `refs/` hold either `ref: <path>` or a bare
//! object id. Symbolic chains are followed for a bounded number of hops.
//! Every write goes through a [`Lockfile`] on the file being changed.

use crate::artifacts::branch::RefError;
use crate::artifacts::branch::branch_name::{BranchName, HEAD_REF_NAME, SymRefName};
use crate::artifacts::core::lockfile::Lockfile;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const SYMREF_PREFIX: &str = "ref: ";
const MAX_SYMREF_DEPTH: usize = 5;

pub const ORIG_HEAD: &str = "ORIG_HEAD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefValue {
    Symbolic(SymRefName),
    Direct(ObjectId),
}

impl RefValue {
    fn read(path: &Path) -> anyhow::Result<Option<RefValue>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read ref {}", path.display()));
            }
        };
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        match content.strip_prefix(SYMREF_PREFIX) {
            Some(target) => Ok(Some(RefValue::Symbolic(SymRefName::new(target.trim())))),
            None => Ok(Some(RefValue::Direct(ObjectId::try_parse(content.to_string())?))),
        }
    }
}

#[derive(Debug)]
pub struct Refs {
    path: PathBuf,
}

impl Refs {
    pub fn new(path: PathBuf) -> Self {
        Refs { path }
    }

    pub fn head_path(&self) -> PathBuf {
        self.path.join(HEAD_REF_NAME)
    }

    pub fn refs_path(&self) -> PathBuf {
        self.path.join("refs")
    }

    pub fn heads_path(&self) -> PathBuf {
        self.refs_path().join("heads")
    }

    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        self.read_symref(&self.head_path())
    }

    /// Move whatever `HEAD` ultimately points at to `oid`.
    pub fn update_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_symref(&self.head_path(), oid, 0)
    }

    /// Attach `HEAD` to `revision` when it names a branch, otherwise detach
    /// it at `oid`.
    pub fn set_head(&self, revision: &str, oid: &ObjectId) -> anyhow::Result<()> {
        let head = self.head_path();

        if self.heads_path().join(revision).is_file() {
            self.write_ref_file(&head, &format!("{SYMREF_PREFIX}refs/heads/{revision}"))
        } else {
            self.write_ref_file(&head, oid.as_ref())
        }
    }

    /// Point `HEAD` at `branch`, which need not exist yet.
    pub fn attach_head(&self, branch: &BranchName) -> anyhow::Result<()> {
        let target = SymRefName::from(branch);
        self.write_ref_file(&self.head_path(), &format!("{SYMREF_PREFIX}{target}"))
    }

    /// The ref `HEAD` resolves to, or `HEAD` itself when detached.
    pub fn current_ref(&self) -> anyhow::Result<SymRefName> {
        let mut current = SymRefName::head();

        for _ in 0..MAX_SYMREF_DEPTH {
            match RefValue::read(&self.path.join(current.as_ref_path()))? {
                Some(RefValue::Symbolic(target)) => current = target,
                _ => return Ok(current),
            }
        }

        anyhow::bail!("symbolic ref chain from HEAD is too deep")
    }

    pub fn is_current_branch(&self, name: &BranchName) -> anyhow::Result<bool> {
        Ok(self.current_ref()? == SymRefName::from(name))
    }

    /// Look `name` up as `<git>/<name>`, `<git>/refs/<name>` and
    /// `<git>/refs/heads/<name>`, in that order.
    pub fn read_ref(&self, name: &str) -> anyhow::Result<Option<ObjectId>> {
        match self.find_ref_path(name) {
            Some(path) => self.read_symref(&path),
            None => Ok(None),
        }
    }

    /// Write `oid` to an arbitrary ref such as `ORIG_HEAD`.
    pub fn update_ref(&self, name: &str, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_symref(&self.path.join(name), oid, 0)
    }

    pub fn delete_ref(&self, name: &str) -> anyhow::Result<()> {
        match std::fs::remove_file(self.path.join(name)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    pub fn create_branch(&self, name: &BranchName, oid: &ObjectId) -> anyhow::Result<()> {
        let branch_path = self.heads_path().join(name.as_ref());

        if branch_path.exists() {
            return Err(RefError::invalid_branch(format!(
                "A branch named '{name}' already exists."
            ))
            .into());
        }

        self.write_ref_file(&branch_path, oid.as_ref())?;
        debug!(branch = %name, %oid, "created branch");

        Ok(())
    }

    /// Remove a branch and return the id it pointed at.
    pub fn delete_branch(&self, name: &BranchName) -> anyhow::Result<ObjectId> {
        let branch_path = self.heads_path().join(name.as_ref());

        let Some(oid) = self.read_symref(&branch_path)? else {
            return Err(RefError::invalid_branch(format!("branch '{name}' not found.")).into());
        };

        let lock = Lockfile::acquire(&branch_path)?;
        std::fs::remove_file(&branch_path)
            .with_context(|| format!("failed to delete branch file {}", branch_path.display()))?;
        lock.rollback()?;
        self.prune_empty_parents(&branch_path)?;

        Ok(oid)
    }

    pub fn list_branches(&self) -> anyhow::Result<Vec<SymRefName>> {
        self.list_refs(&self.heads_path())
    }

    /// Every ref pointing at each id, `HEAD` included.
    pub fn reverse_refs(&self) -> anyhow::Result<HashMap<ObjectId, Vec<SymRefName>>> {
        let mut refs = self.list_refs(&self.refs_path())?;
        refs.push(SymRefName::head());

        let mut reverse: HashMap<ObjectId, Vec<SymRefName>> = HashMap::new();
        for name in refs {
            if let Some(oid) = self.read_symref(&self.path.join(name.as_ref_path()))? {
                reverse.entry(oid).or_default().push(name);
            }
        }

        Ok(reverse)
    }

    fn find_ref_path(&self, name: &str) -> Option<PathBuf> {
        [self.path.clone(), self.refs_path(), self.heads_path()]
            .into_iter()
            .map(|base| base.join(name))
            .find(|path| path.is_file())
    }

    fn read_symref(&self, path: &Path) -> anyhow::Result<Option<ObjectId>> {
        let mut path = path.to_path_buf();

        for _ in 0..MAX_SYMREF_DEPTH {
            match RefValue::read(&path)? {
                Some(RefValue::Symbolic(target)) => path = self.path.join(target.as_ref_path()),
                Some(RefValue::Direct(oid)) => return Ok(Some(oid)),
                None => return Ok(None),
            }
        }

        anyhow::bail!("symbolic ref chain at {} is too deep", path.display())
    }

    /// Hold the lock on `path` while following it; the final direct ref is
    /// the one rewritten.
    fn update_symref(&self, path: &Path, oid: &ObjectId, depth: usize) -> anyhow::Result<()> {
        if depth >= MAX_SYMREF_DEPTH {
            anyhow::bail!("symbolic ref chain at {} is too deep", path.display());
        }

        let mut lock = Lockfile::acquire_creating_parents(path)?;

        match RefValue::read(path)? {
            Some(RefValue::Symbolic(target)) => {
                let target_path = self.path.join(target.as_ref_path());
                self.update_symref(&target_path, oid, depth + 1)?;
                lock.rollback()?;
            }
            Some(RefValue::Direct(_)) | None => {
                lock.write_bytes(format!("{oid}\n").as_bytes())?;
                lock.commit()?;
                debug!(path = %path.display(), %oid, "updated ref");
            }
        }

        Ok(())
    }

    fn write_ref_file(&self, path: &Path, content: &str) -> anyhow::Result<()> {
        let mut lock = Lockfile::acquire_creating_parents(path)?;
        lock.write_bytes(format!("{content}\n").as_bytes())?;
        lock.commit()?;

        Ok(())
    }

    fn list_refs(&self, path: &Path) -> anyhow::Result<Vec<SymRefName>> {
        let mut refs = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.path).ok()?;
                Some(SymRefName::new(relative.to_string_lossy()))
            })
            .collect::<Vec<_>>();
        refs.sort();

        Ok(refs)
    }

    fn prune_empty_parents(&self, path: &Path) -> anyhow::Result<()> {
        let heads = self.heads_path();
        let mut current = path.parent();

        while let Some(dir) = current {
            if dir == heads || dir.read_dir()?.next().is_some() {
                break;
            }
            std::fs::remove_dir(dir)
                .with_context(|| format!("failed to remove empty ref directory {}", dir.display()))?;
            current = dir.parent();
        }

        Ok(())
    }
}
