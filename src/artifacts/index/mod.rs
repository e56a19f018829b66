//! Index file format
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "DIRC" (4 bytes)
//!   - Version: 2 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length):
//!   - Sorted by (path bytes, stage)
//!   - Each entry padded to 8-byte alignment
//!
//! Checksum (20 bytes):
//!   - SHA-1 hash of all preceding bytes
//! ```

use thiserror::Error;

pub mod checksum;
pub mod entry_mode;
pub mod index_entry;
pub mod index_header;

/// Size of SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Size of index header in bytes
pub const HEADER_SIZE: usize = 12;

/// Magic signature identifying index files
pub const SIGNATURE: &str = "DIRC";

/// Index file format version
pub const VERSION: u32 = 2;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IndexError {
    #[error("index file corrupt: checksum does not match value stored on disk")]
    Checksum,
    #[error("index file corrupt: unexpected end of file")]
    Truncated,
    #[error("index file corrupt: {0}")]
    BadHeader(String),
    #[error("index is not locked for update")]
    NotLocked,
}
