//! Staging index
//!
//! In-memory model of `.git/index`. Entries are keyed by `(path, stage)` so
//! iteration follows the on-disk order. A second map records, for every
//! directory, the entry paths beneath it; it backs the file/directory
//! exclusion rules and the `tracked_dir` queries.
//!
//! Mutators must run between `load_for_update` and `write_updates` (or
//! `rollback`): the `index.lock` file is held for that whole span.

use crate::artifacts::core::lockfile::Lockfile;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{
    ENTRY_BLOCK, ENTRY_MIN_SIZE, EntryMetadata, IndexEntry, STAGE_BASE, STAGE_MERGED,
    STAGE_THEIRS, Stage,
};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::{HEADER_SIZE, IndexError};
use crate::artifacts::objects::object::{Packable, Unpackable};
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

type EntryKey = (String, Stage);

#[derive(Debug)]
pub struct Index {
    /// Path to the index file (typically `.git/index`)
    path: Box<Path>,
    entries: BTreeMap<EntryKey, IndexEntry>,
    /// Directory path mapped to the entry paths stored under it
    parents: BTreeMap<String, BTreeSet<String>>,
    lock: Option<Lockfile>,
    changed: bool,
}

pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            parents: BTreeMap::new(),
            lock: None,
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire `index.lock`, then read the current contents.
    pub fn load_for_update(&mut self) -> anyhow::Result<()> {
        if self.lock.is_none() {
            self.lock = Some(Lockfile::acquire(&self.path)?);
        }

        self.load()
    }

    /// Read the index file without taking the update lock. A missing or
    /// empty file yields an empty index.
    pub fn load(&mut self) -> anyhow::Result<()> {
        self.reset();

        if !self.path.exists() {
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new()
            .read(true)
            .open(&self.path)
            .with_context(|| format!("could not open {}", self.path.display()))?;
        let mut guard = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        if guard.deref_mut().metadata()?.len() == 0 {
            return Ok(());
        }

        let mut reader = Checksum::new(guard.deref_mut());
        let entries_count = self.parse_header(&mut reader)?;
        self.parse_entries(entries_count, &mut reader)?;
        reader.verify()?;

        trace!(entries = self.entries.len(), "loaded index");
        Ok(())
    }

    fn parse_header<R: Read>(&self, reader: &mut Checksum<R>) -> anyhow::Result<u32> {
        let header_bytes = reader.read(HEADER_SIZE)?;
        let header = IndexHeader::parse(&header_bytes)?;

        Ok(header.entries_count)
    }

    fn parse_entries<R: Read>(
        &mut self,
        entries_count: u32,
        reader: &mut Checksum<R>,
    ) -> anyhow::Result<()> {
        for _ in 0..entries_count {
            let mut entry_bytes = reader.read(ENTRY_MIN_SIZE)?.to_vec();

            // the path is NUL terminated, so the last byte of a full entry is 0
            while entry_bytes.last() != Some(&0) {
                entry_bytes.extend_from_slice(&reader.read(ENTRY_BLOCK)?);
            }

            let entry = IndexEntry::deserialize(&entry_bytes[..])?;
            self.store_entry(entry);
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.parents.clear();
        self.changed = false;
    }

    /// Drop every entry; the next `write_updates` persists an empty index.
    pub fn clear(&mut self) {
        self.reset();
        self.changed = true;
    }

    /// Stage `entry` at stage 0, evicting any conflict stages at its path,
    /// any entry at one of its parent directories and any entry beneath it.
    pub fn add(&mut self, entry: IndexEntry) {
        let entry = entry.with_stage(STAGE_MERGED);
        let path = entry.path_str().to_string();

        for stage in STAGE_BASE..=STAGE_THEIRS {
            self.remove_entry_with_stage(&path, stage);
        }
        self.discard_conflicts(&entry);
        self.store_entry(entry);
        self.changed = true;
    }

    /// Record a conflict at `path`: one entry per present side, staged
    /// 1 (base), 2 (ours) and 3 (theirs).
    pub fn add_conflict_set(&mut self, path: &Path, sides: [Option<DatabaseEntry>; 3]) {
        let key = path_key(path);
        self.remove_entry_with_stage(&key, STAGE_MERGED);

        for (slot, side) in sides.iter().enumerate() {
            let stage = slot as Stage + 1;
            self.remove_entry_with_stage(&key, stage);

            if let Some(side) = side {
                let entry = IndexEntry::from_database_entry(path.to_path_buf(), side, stage);
                self.discard_conflicts(&entry);
                self.store_entry(entry);
            }
        }

        debug!(path = %key, "recorded conflict");
        self.changed = true;
    }

    /// Install a stage-0 entry pointing at a stored object, with an empty stat.
    pub fn add_from_db(&mut self, path: &Path, entry: &DatabaseEntry) {
        self.add(IndexEntry::from_database_entry(
            path.to_path_buf(),
            entry,
            STAGE_MERGED,
        ));
    }

    /// Remove every stage at `path` and every entry beneath it.
    pub fn remove(&mut self, path: &Path) {
        let key = path_key(path);
        self.remove_all_stages(&key);
        self.remove_children(&key);
        self.changed = true;
    }

    pub fn has_conflict(&self) -> bool {
        self.entries.values().any(|entry| entry.stage > STAGE_MERGED)
    }

    pub fn conflict_paths(&self) -> BTreeSet<PathBuf> {
        self.entries
            .values()
            .filter(|entry| entry.stage > STAGE_MERGED)
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Entries in `(path, stage)` byte order.
    pub fn entries_ordered(&self) -> Vec<&IndexEntry> {
        self.entries.values().collect()
    }

    pub fn entry_for(&self, path: &Path, stage: Stage) -> Option<&IndexEntry> {
        self.entries.get(&(path_key(path), stage))
    }

    /// Every stage recorded at `path`.
    pub fn entries_at(&self, path: &Path) -> Vec<&IndexEntry> {
        let key = path_key(path);
        (STAGE_MERGED..=STAGE_THEIRS)
            .filter_map(|stage| self.entries.get(&(key.clone(), stage)))
            .collect()
    }

    pub fn entries_under(&self, path: &Path) -> Vec<&IndexEntry> {
        let key = path_key(path);
        if key.is_empty() || key == "." {
            return self.entries_ordered();
        }

        let mut found = self.entries_at(path);
        if let Some(children) = self.parents.get(&key) {
            for child in children {
                found.extend(self.entries_at(Path::new(child)));
            }
        }

        found
    }

    pub fn tracked_file(&self, path: &Path) -> bool {
        !self.entries_at(path).is_empty()
    }

    pub fn tracked_dir(&self, path: &Path) -> bool {
        self.parents.contains_key(&path_key(path))
    }

    pub fn tracked(&self, path: &Path) -> bool {
        self.tracked_file(path) || self.tracked_dir(path)
    }

    /// Refresh the cached stat of a stage-0 entry; its id and mode stay.
    pub fn update_entry_stat(&mut self, entry: &IndexEntry, stat: &EntryMetadata) {
        if let Some(existing_entry) = self.entries.get_mut(&entry.key()) {
            existing_entry.update_stat(stat);
            self.changed = true;
        }
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Persist the entries through the held lock when anything changed,
    /// otherwise just release the lock.
    pub fn write_updates(&mut self) -> anyhow::Result<()> {
        let lock = self.lock.take().ok_or(IndexError::NotLocked)?;

        if !self.changed {
            lock.rollback()?;
            return Ok(());
        }

        let mut writer = Checksum::new(lock);

        let header = IndexHeader::with_count(self.entries.len() as u32);
        writer.write(&header.serialize()?)?;

        for entry in self.entries.values() {
            writer.write(&entry.serialize()?)?;
        }

        writer.write_checksum()?;
        writer.into_inner().commit()?;
        self.changed = false;

        debug!(entries = self.entries.len(), "wrote index");
        Ok(())
    }

    /// Give up the update lock, leaving the file on disk untouched.
    pub fn rollback(&mut self) -> anyhow::Result<()> {
        if let Some(lock) = self.lock.take() {
            lock.rollback()?;
        }
        self.changed = false;

        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    fn discard_conflicts(&mut self, entry: &IndexEntry) {
        for parent in entry.parent_dirs() {
            self.remove_all_stages(&path_key(parent));
        }
        self.remove_children(entry.path_str());
    }

    fn store_entry(&mut self, entry: IndexEntry) {
        let path = entry.path_str().to_string();
        for parent in entry.parent_dirs() {
            self.parents
                .entry(path_key(parent))
                .or_default()
                .insert(path.clone());
        }

        self.entries.insert(entry.key(), entry);
    }

    fn remove_children(&mut self, path: &str) {
        if let Some(children) = self.parents.get(path).cloned() {
            for child in children {
                self.remove_all_stages(&child);
            }
        }
    }

    fn remove_all_stages(&mut self, path: &str) {
        for stage in STAGE_MERGED..=STAGE_THEIRS {
            self.remove_entry_with_stage(path, stage);
        }
    }

    fn remove_entry_with_stage(&mut self, path: &str, stage: Stage) {
        let Some(entry) = self.entries.remove(&(path.to_string(), stage)) else {
            return;
        };

        // the path may still be held by another stage
        if self.entries_at(&entry.name).is_empty() {
            for parent in entry.parent_dirs() {
                let parent = path_key(parent);
                if let Some(children) = self.parents.get_mut(&parent) {
                    children.remove(path);
                    if children.is_empty() {
                        self.parents.remove(&parent);
                    }
                }
            }
        }
    }
}
