//! Index entries
//!
//! Each entry caches the stat of a tracked file next to the id of its blob,
//! which lets status detect changes without reading file content.
//!
//! ## Entry Format
//!
//! ```text
//! ctime s/ns, mtime s/ns, dev, ino, mode, uid, gid, size   10 x u32
//! oid                                                      20 bytes
//! flags (stage << 12 | min(path length, 0xFFF))            u16
//! path, NUL terminated, zero padded to a multiple of 8
//! ```

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::fs::Metadata;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Largest path length the flags field can record
const MAX_PATH_SIZE: usize = 0xFFF;

/// Block size for entry alignment (8 bytes)
pub const ENTRY_BLOCK: usize = 8;

/// Minimum size of an index entry in bytes
pub const ENTRY_MIN_SIZE: usize = 64;

/// Size of the fixed-width part of an entry, before the path
const ENTRY_FIXED_SIZE: usize = 62;

const STAGE_SHIFT: u16 = 12;
const STAGE_MASK: u16 = 0x3;

/// Stage of an entry: 0 when merged, 1/2/3 for the base/ours/theirs sides
/// of a conflict.
pub type Stage = u8;

pub const STAGE_MERGED: Stage = 0;
pub const STAGE_BASE: Stage = 1;
pub const STAGE_OURS: Stage = 2;
pub const STAGE_THEIRS: Stage = 3;

#[derive(Debug, Clone, new)]
pub struct IndexEntry {
    /// File path relative to repository root
    pub name: PathBuf,
    pub oid: ObjectId,
    pub metadata: EntryMetadata,
    #[new(value = "STAGE_MERGED")]
    pub stage: Stage,
}

impl IndexEntry {
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    /// Build an entry for content that only exists in the database. The
    /// empty stat forces the next status run to hash the file.
    pub fn from_database_entry(name: PathBuf, entry: &DatabaseEntry, stage: Stage) -> Self {
        let metadata = EntryMetadata {
            mode: entry.mode,
            ..Default::default()
        };
        IndexEntry::new(name, entry.oid.clone(), metadata).with_stage(stage)
    }

    /// Ordering key: the path as UTF-8 bytes, then the stage.
    pub fn key(&self) -> (String, Stage) {
        (self.path_str().to_string(), self.stage)
    }

    pub fn path_str(&self) -> &str {
        self.name.to_str().unwrap_or_default()
    }

    pub fn basename(&self) -> anyhow::Result<&str> {
        self.name
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid file name"))
    }

    /// Strict ancestors of the entry's path, shallowest first.
    pub fn parent_dirs(&self) -> Vec<&Path> {
        let mut dirs = self
            .name
            .ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect::<Vec<_>>();
        dirs.reverse();

        dirs
    }

    pub fn database_entry(&self) -> DatabaseEntry {
        DatabaseEntry::new(self.oid.clone(), self.metadata.mode)
    }

    pub fn stat_match(&self, other: &EntryMetadata) -> bool {
        (self.metadata.size == 0 || self.metadata.size == other.size)
            && self.metadata.mode == other.mode
    }

    pub fn times_match(&self, other: &EntryMetadata) -> bool {
        self.metadata.ctime == other.ctime
            && self.metadata.ctime_nsec == other.ctime_nsec
            && self.metadata.mtime == other.mtime
            && self.metadata.mtime_nsec == other.mtime_nsec
    }

    /// Replace the cached stat, leaving the id and mode alone.
    pub fn update_stat(&mut self, stat: &EntryMetadata) {
        let mode = self.metadata.mode;
        self.metadata = EntryMetadata {
            mode,
            ..stat.clone()
        };
    }

    fn flags(&self) -> u16 {
        let path_len = self.path_str().len().min(MAX_PATH_SIZE) as u16;
        ((self.stage as u16 & STAGE_MASK) << STAGE_SHIFT) | path_len
    }
}

impl PartialEq for IndexEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.stage == other.stage
            && self.oid == other.oid
            && self.metadata.mode == other.metadata.mode
    }
}

impl Eq for IndexEntry {}

/// Stat fields cached per entry
///
/// Only the low 32 bits of each field reach the file; comparisons happen on
/// the truncated values so a fresh stat can match one read back from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    pub ctime: i64,
    pub ctime_nsec: i64,
    pub mtime: i64,
    pub mtime_nsec: i64,
    pub dev: u64,
    pub ino: u64,
    pub mode: EntryMode,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
}

impl EntryMetadata {
    pub fn is_dir(&self) -> bool {
        self.mode.is_tree()
    }
}

impl Packable for IndexEntry {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let metadata = &self.metadata;

        let mut entry_bytes = Vec::with_capacity(ENTRY_MIN_SIZE + self.path_str().len());
        entry_bytes.write_u32::<NetworkEndian>(metadata.ctime as u32)?;
        entry_bytes.write_u32::<NetworkEndian>(metadata.ctime_nsec as u32)?;
        entry_bytes.write_u32::<NetworkEndian>(metadata.mtime as u32)?;
        entry_bytes.write_u32::<NetworkEndian>(metadata.mtime_nsec as u32)?;
        entry_bytes.write_u32::<NetworkEndian>(metadata.dev as u32)?;
        entry_bytes.write_u32::<NetworkEndian>(metadata.ino as u32)?;
        entry_bytes.write_u32::<NetworkEndian>(metadata.mode.as_u32())?;
        entry_bytes.write_u32::<NetworkEndian>(metadata.uid)?;
        entry_bytes.write_u32::<NetworkEndian>(metadata.gid)?;
        entry_bytes.write_u32::<NetworkEndian>(metadata.size as u32)?;
        self.oid.write_h40_to(&mut entry_bytes)?;
        entry_bytes.write_u16::<NetworkEndian>(self.flags())?;
        entry_bytes.write_all(self.path_str().as_bytes())?;

        // at least one NUL, then pad to the block size
        entry_bytes.push(0);
        while entry_bytes.len() % ENTRY_BLOCK != 0 {
            entry_bytes.push(0);
        }

        Ok(Bytes::from(entry_bytes))
    }
}

impl Unpackable for IndexEntry {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        if bytes.len() < ENTRY_MIN_SIZE {
            return Err(anyhow::anyhow!("Invalid index entry size"));
        }

        let field = |at: usize| NetworkEndian::read_u32(&bytes[at..at + 4]);
        let mode = EntryMode::try_from(field(24))?;
        let oid = ObjectId::from_raw(&bytes[40..60])?;
        let flags = NetworkEndian::read_u16(&bytes[60..62]);

        let name_end = bytes[ENTRY_FIXED_SIZE..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| anyhow::anyhow!("Missing null terminator in entry name"))?;
        let name_bytes = &bytes[ENTRY_FIXED_SIZE..ENTRY_FIXED_SIZE + name_end];
        let name = PathBuf::from(
            std::str::from_utf8(name_bytes)
                .map_err(|_| anyhow::anyhow!("Invalid UTF-8 in entry name"))?,
        );

        Ok(IndexEntry {
            name,
            oid,
            metadata: EntryMetadata {
                ctime: field(0) as i64,
                ctime_nsec: field(4) as i64,
                mtime: field(8) as i64,
                mtime_nsec: field(12) as i64,
                dev: field(16) as u64,
                ino: field(20) as u64,
                mode,
                uid: field(28),
                gid: field(32),
                size: field(36) as u64,
            },
            stage: ((flags >> STAGE_SHIFT) & STAGE_MASK) as Stage,
        })
    }
}

impl TryFrom<(&Path, Metadata)> for EntryMetadata {
    type Error = anyhow::Error;

    fn try_from((file_path, metadata): (&Path, Metadata)) -> Result<Self, Self::Error> {
        let mode = if metadata.is_dir() {
            EntryMode::Directory
        } else {
            EntryMode::File(FileMode::from_path(file_path))
        };

        Ok(Self::from_stat(&metadata, mode))
    }
}

impl EntryMetadata {
    #[cfg(unix)]
    fn from_stat(metadata: &Metadata, mode: EntryMode) -> Self {
        use std::os::unix::fs::MetadataExt;

        // truncate to what the on-disk format keeps
        Self {
            ctime: metadata.ctime() as u32 as i64,
            ctime_nsec: metadata.ctime_nsec() as u32 as i64,
            mtime: metadata.mtime() as u32 as i64,
            mtime_nsec: metadata.mtime_nsec() as u32 as i64,
            dev: metadata.dev() as u32 as u64,
            ino: metadata.ino() as u32 as u64,
            mode,
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size() as u32 as u64,
        }
    }

    #[cfg(not(unix))]
    fn from_stat(metadata: &Metadata, mode: EntryMode) -> Self {
        let seconds = |time: std::io::Result<std::time::SystemTime>| {
            time.ok()
                .and_then(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|elapsed| (elapsed.as_secs() as u32 as i64, elapsed.subsec_nanos() as i64))
                .unwrap_or_default()
        };
        let (mtime, mtime_nsec) = seconds(metadata.modified());

        Self {
            ctime: mtime,
            ctime_nsec: mtime_nsec,
            mtime,
            mtime_nsec,
            mode,
            size: metadata.len() as u32 as u64,
            ..Default::default()
        }
    }
}
