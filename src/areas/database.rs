//! Loose object storage
//!
//! Objects are deflated and written to `objects/<aa>/<rest>` through a
//! temporary sibling that is renamed into place, so a reader never sees a
//! partial object. Parsed objects are cached by id for the lifetime of the
//! database handle.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::tree_diff::{ChangeSet, TreeDiff};
use crate::artifacts::log::path_filter::PathFilter;
use crate::artifacts::objects::SHORT_OID_LENGTH;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::object::{Object, ObjectBox, ObjectError, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use bytes::Bytes;
use fake::rand;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    objects: RefCell<HashMap<ObjectId, ObjectBox>>,
}

impl Database {
    pub fn new(path: PathBuf) -> Self {
        Database {
            path,
            objects: RefCell::new(HashMap::new()),
        }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    pub fn hash(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        object.object_id()
    }

    pub fn exists(&self, oid: &ObjectId) -> bool {
        self.path.join(oid.to_path()).is_file()
    }

    /// Write an object unless it is already present and return its id.
    pub fn store(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        let content = object.serialize()?;
        let oid = object.object_id()?;
        let object_path = self.path.join(oid.to_path());

        if object_path.exists() {
            trace!(%oid, "object already stored");
            return Ok(oid);
        }

        self.write_object(&object_path, content)?;
        debug!(%oid, kind = %object.object_type(), "stored object");

        Ok(oid)
    }

    /// Store a tree built from the index, subtrees first.
    pub fn store_tree(&self, tree: &Tree) -> anyhow::Result<ObjectId> {
        tree.traverse(&mut |subtree: &Tree| self.store(subtree).map(|_| ()))?;
        tree.object_id()
    }

    pub fn load(&self, oid: &ObjectId) -> anyhow::Result<ObjectBox> {
        if let Some(object) = self.objects.borrow().get(oid) {
            return Ok(object.clone());
        }

        let object = self.read_object(oid)?;
        self.objects.borrow_mut().insert(oid.clone(), object.clone());

        Ok(object)
    }

    pub fn load_blob(&self, oid: &ObjectId) -> anyhow::Result<Blob> {
        match self.load(oid)? {
            ObjectBox::Blob(blob) => Ok(*blob),
            other => Err(Self::invalid_type(oid, ObjectType::Blob, other.object_type())),
        }
    }

    pub fn load_tree(&self, oid: &ObjectId) -> anyhow::Result<Tree> {
        match self.load(oid)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            other => Err(Self::invalid_type(oid, ObjectType::Tree, other.object_type())),
        }
    }

    pub fn load_commit(&self, oid: &ObjectId) -> anyhow::Result<Commit> {
        match self.load(oid)? {
            ObjectBox::Commit(commit) => Ok(*commit),
            other => Err(Self::invalid_type(oid, ObjectType::Commit, other.object_type())),
        }
    }

    /// Load a tree, or the tree a commit points at.
    pub fn load_tree_of(&self, oid: &ObjectId) -> anyhow::Result<Tree> {
        match self.load(oid)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            ObjectBox::Commit(commit) => self.load_tree(commit.tree_oid()),
            ObjectBox::Blob(_) => Err(Self::invalid_type(oid, ObjectType::Tree, ObjectType::Blob)),
        }
    }

    pub fn load_slim_commit(&self, oid: &ObjectId) -> anyhow::Result<SlimCommit> {
        Ok(self.load_commit(oid)?.to_slim(oid.clone()))
    }

    pub fn object_type(&self, oid: &ObjectId) -> anyhow::Result<ObjectType> {
        Ok(self.load(oid)?.object_type())
    }

    /// The shortest prefix of at least seven characters that names only
    /// `oid` in this store.
    pub fn short_oid(&self, oid: &ObjectId) -> anyhow::Result<String> {
        let full = oid.as_ref();
        let candidates = self.prefix_match(&full[..SHORT_OID_LENGTH])?;

        let length = (SHORT_OID_LENGTH..full.len())
            .find(|&length| {
                candidates
                    .iter()
                    .filter(|candidate| candidate.starts_with(&full[..length]))
                    .all(|candidate| candidate == oid)
            })
            .unwrap_or(full.len());

        Ok(full[..length].to_string())
    }

    /// Every stored id starting with `prefix`, in ascending order.
    pub fn prefix_match(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        let directories = if prefix.len() >= 2 {
            vec![prefix[..2].to_string()]
        } else {
            (0..=255u8).map(|byte| format!("{byte:02x}")).collect()
        };

        let mut matches = Vec::new();
        for directory in directories {
            let dir_path = self.path.join(&directory);
            if !dir_path.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(&dir_path)? {
                let name = entry?.file_name();
                let full = format!("{}{}", directory, name.to_string_lossy());

                if full.starts_with(&prefix)
                    && let Ok(oid) = ObjectId::try_parse(full)
                {
                    matches.push(oid);
                }
            }
        }
        matches.sort();

        Ok(matches)
    }

    pub fn tree_diff(
        &self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        filter: &PathFilter,
    ) -> anyhow::Result<ChangeSet> {
        let mut diff = TreeDiff::new(self);
        diff.compare_oids(old, new, filter)?;
        Ok(diff.into_changes())
    }

    /// Flatten a tree (or a commit's tree) into its leaves, keyed by path
    /// below `prefix`.
    pub fn load_tree_list(
        &self,
        oid: Option<&ObjectId>,
        prefix: &Path,
    ) -> anyhow::Result<BTreeMap<PathBuf, DatabaseEntry>> {
        let mut list = BTreeMap::new();
        if let Some(oid) = oid {
            self.build_tree_list(oid, prefix, &mut list)?;
        }
        Ok(list)
    }

    fn build_tree_list(
        &self,
        oid: &ObjectId,
        prefix: &Path,
        list: &mut BTreeMap<PathBuf, DatabaseEntry>,
    ) -> anyhow::Result<()> {
        for (name, entry) in self.load_tree_of(oid)?.into_entries() {
            let path = prefix.join(name);
            if entry.is_tree() {
                self.build_tree_list(&entry.oid, &path, list)?;
            } else {
                list.insert(path, entry);
            }
        }
        Ok(())
    }

    fn read_object(&self, oid: &ObjectId) -> anyhow::Result<ObjectBox> {
        let object_path = self.path.join(oid.to_path());
        let compressed = std::fs::read(&object_path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => anyhow::Error::new(ObjectError::NotFound {
                oid: oid.to_string(),
            }),
            _ => anyhow::Error::new(err)
                .context(format!("Unable to read object file {}", object_path.display())),
        })?;

        let content = Self::decompress(&compressed).map_err(|err| Self::bad_object(oid, err))?;
        let mut reader = Cursor::new(content);

        let (object_type, size) =
            ObjectType::parse_header(&mut reader).map_err(|err| Self::bad_object(oid, err))?;
        let payload_len = reader.get_ref().len() - reader.position() as usize;
        if payload_len != size {
            return Err(Self::bad_object(
                oid,
                anyhow::anyhow!("header declares {size} bytes, found {payload_len}"),
            ));
        }

        let object = match object_type {
            ObjectType::Blob => Blob::deserialize(reader).map(|blob| ObjectBox::Blob(Box::new(blob))),
            ObjectType::Tree => Tree::deserialize(reader).map(|tree| ObjectBox::Tree(Box::new(tree))),
            ObjectType::Commit => {
                Commit::deserialize(reader).map(|commit| ObjectBox::Commit(Box::new(commit)))
            }
        }
        .map_err(|err| Self::bad_object(oid, err))?;

        trace!(%oid, kind = %object_type, "loaded object");

        Ok(object)
    }

    fn write_object(&self, object_path: &Path, content: Bytes) -> anyhow::Result<()> {
        let object_dir = object_path
            .parent()
            .with_context(|| format!("Invalid object path {}", object_path.display()))?;
        std::fs::create_dir_all(object_dir).with_context(|| {
            format!("Unable to create object directory {}", object_dir.display())
        })?;

        let temp_path = object_dir.join(Self::generate_temp_name());
        let compressed = Self::compress(&content)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .with_context(|| format!("Unable to open object file {}", temp_path.display()))?;
        file.write_all(&compressed)
            .with_context(|| format!("Unable to write object file {}", temp_path.display()))?;
        drop(file);

        std::fs::rename(&temp_path, object_path)
            .with_context(|| format!("Unable to rename object file to {}", object_path.display()))
    }

    fn compress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder
            .write_all(data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut content = Vec::new();
        decoder
            .read_to_end(&mut content)
            .context("Unable to decompress object content")?;

        Ok(content)
    }

    fn generate_temp_name() -> String {
        format!("tmp_obj_{}", rand::random::<u32>())
    }

    fn invalid_type(oid: &ObjectId, expected: ObjectType, actual: ObjectType) -> anyhow::Error {
        ObjectError::InvalidType {
            oid: oid.to_string(),
            expected,
            actual,
        }
        .into()
    }

    fn bad_object(oid: &ObjectId, err: anyhow::Error) -> anyhow::Error {
        ObjectError::BadObject {
            oid: oid.to_string(),
            reason: err.to_string(),
        }
        .into()
    }
}
