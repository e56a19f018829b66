use crate::areas::database::Database;
use crate::areas::workspace::Workspace;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use bytes::Bytes;
use std::path::{Path, PathBuf};

const NULL_OID_RAW: &str = "0000000000000000000000000000000000000000";
const NULL_PATH: &str = "/dev/null";

/// One side of a file diff: a blob in the database, a workspace file, or
/// nothing at all for added and deleted files.
#[derive(Debug, Clone)]
pub struct DiffTarget {
    pub path: PathBuf,
    pub oid: ObjectId,
    pub mode: Option<EntryMode>,
    pub data: Bytes,
}

impl DiffTarget {
    pub fn from_entry(
        path: &Path,
        entry: &DatabaseEntry,
        database: &Database,
    ) -> anyhow::Result<Self> {
        let blob = database.load_blob(&entry.oid)?;

        Ok(DiffTarget {
            path: path.to_path_buf(),
            oid: entry.oid.clone(),
            mode: Some(entry.mode),
            data: blob.into_content(),
        })
    }

    pub fn from_file(path: &Path, mode: EntryMode, workspace: &Workspace) -> anyhow::Result<Self> {
        let blob = workspace.parse_blob(path)?;

        Ok(DiffTarget {
            path: path.to_path_buf(),
            oid: blob.object_id()?,
            mode: Some(mode),
            data: blob.into_content(),
        })
    }

    pub fn from_nothing(path: &Path) -> anyhow::Result<Self> {
        Ok(DiffTarget {
            path: path.to_path_buf(),
            oid: ObjectId::try_parse(NULL_OID_RAW.to_string())?,
            mode: None,
            data: Bytes::new(),
        })
    }

    /// `a/<path>` or `b/<path>`, or `/dev/null` for a missing side.
    pub fn diff_path(&self, prefix: &str) -> String {
        match self.mode {
            Some(_) => format!("{prefix}/{}", self.path.display()),
            None => NULL_PATH.to_string(),
        }
    }

    pub fn pretty_mode(&self) -> String {
        self.mode.unwrap_or(EntryMode::REGULAR).to_string()
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.data)
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn same_as(&self, other: &DiffTarget) -> bool {
        self.oid == other.oid && self.mode == other.mode
    }
}
