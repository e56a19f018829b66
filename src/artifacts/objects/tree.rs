//! Tree objects
//!
//! A tree is one directory level: a map from entry name to mode and object
//! id. On disk every entry is `<octal mode> <name>\0<20 raw id bytes>`,
//! ordered the way git orders them (a subtree sorts as if its name ended in
//! `/`), so ids stay interchangeable with trees git writes.
//!
//! Trees read from the database hold only leaves. Trees built from the index
//! nest their subtrees so they can be stored children first.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame_payload};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum TreeEntry {
    /// A directory built from the index, not yet stored.
    Subtree(Tree),
    /// A blob, or a subtree already addressed by id.
    Leaf(DatabaseEntry),
}

impl TreeEntry {
    fn mode(&self) -> EntryMode {
        match self {
            TreeEntry::Subtree(_) => EntryMode::Directory,
            TreeEntry::Leaf(entry) => entry.mode,
        }
    }

    fn object_type(&self) -> ObjectType {
        if self.mode().is_tree() {
            ObjectType::Tree
        } else {
            ObjectType::Blob
        }
    }

    fn oid(&self) -> anyhow::Result<ObjectId> {
        match self {
            TreeEntry::Subtree(tree) => tree.object_id(),
            TreeEntry::Leaf(entry) => Ok(entry.oid.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    /// Build the nested tree for a set of stage-0 index entries.
    pub fn build<'e>(entries: impl IntoIterator<Item = &'e IndexEntry>) -> anyhow::Result<Self> {
        let mut root = Self::default();

        for entry in entries {
            let parents = entry.parent_dirs();
            root.add_entry(&parents, entry)?;
        }

        Ok(root)
    }

    /// Visit every built subtree children first, then this tree.
    pub fn traverse<F>(&self, func: &mut F) -> anyhow::Result<()>
    where
        F: FnMut(&Tree) -> anyhow::Result<()>,
    {
        for entry in self.entries.values() {
            if let TreeEntry::Subtree(tree) = entry {
                tree.traverse(func)?;
            }
        }

        func(self)
    }

    fn add_entry(&mut self, parents: &[&Path], entry: &IndexEntry) -> anyhow::Result<()> {
        let Some((first, rest)) = parents.split_first() else {
            self.entries.insert(
                entry.basename()?.to_string(),
                TreeEntry::Leaf(entry.database_entry()),
            );
            return Ok(());
        };

        let name = first
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("Invalid directory name {}", first.display()))?;

        let subtree = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| TreeEntry::Subtree(Tree::default()));

        match subtree {
            TreeEntry::Subtree(tree) => tree.add_entry(rest, entry),
            TreeEntry::Leaf(_) => anyhow::bail!(
                "cannot add {}: {} is already tracked as a file",
                entry.name.display(),
                first.display()
            ),
        }
    }

    /// Leaves of a tree read from the database, by name.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &DatabaseEntry)> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            TreeEntry::Leaf(leaf) => Some((name, leaf)),
            TreeEntry::Subtree(_) => None,
        })
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, DatabaseEntry)> {
        self.entries
            .into_iter()
            .filter_map(|(name, entry)| match entry {
                TreeEntry::Leaf(leaf) => Some((name, leaf)),
                TreeEntry::Subtree(_) => None,
            })
    }

    pub fn get(&self, name: &str) -> Option<&DatabaseEntry> {
        match self.entries.get(name) {
            Some(TreeEntry::Leaf(entry)) => Some(entry),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in on-disk order.
    fn ordered_entries(&self) -> Vec<(&String, &TreeEntry)> {
        let mut entries = self.entries.iter().collect::<Vec<_>>();
        entries.sort_by_cached_key(|(name, entry)| {
            let mut key = name.as_bytes().to_vec();
            if entry.mode().is_tree() {
                key.push(b'/');
            }
            key
        });
        entries
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut payload = Vec::new();

        for (name, entry) in self.ordered_entries() {
            write!(payload, "{:o} {}", entry.mode().as_u32(), name)?;
            payload.push(0);
            entry.oid()?.write_h40_to(&mut payload)?;
        }

        Ok(frame_payload(self.object_type(), &payload))
    }
}

impl Unpackable for Tree {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            if reader.read_until(b' ', &mut mode_bytes)? == 0 {
                break;
            }
            if mode_bytes.pop() != Some(b' ') {
                anyhow::bail!("unexpected EOF in mode");
            }
            let mode = EntryMode::from_octal_str(std::str::from_utf8(&mode_bytes)?)?;

            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') {
                anyhow::bail!("unexpected EOF in name");
            }
            let name = String::from_utf8(name_bytes.clone())?;

            let oid = ObjectId::read_h40_from(&mut reader).context("unexpected EOF in object id")?;

            entries.insert(name, TreeEntry::Leaf(DatabaseEntry::new(oid, mode)));
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.ordered_entries()
            .into_iter()
            .map(|(name, entry)| {
                format!(
                    "{} {} {}\t{}",
                    entry.mode(),
                    entry.object_type(),
                    entry.oid().unwrap_or_default(),
                    name
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
