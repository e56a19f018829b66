//! Object kinds and their canonical serialization
//!
//! - **Blob**: opaque file content
//! - **Tree**: ordered directory listing (name, mode, object id)
//! - **Commit**: tree, parents, identities and message
//!
//! Every object is framed as `<type> <size>\0<payload>` before hashing and
//! compression.

pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in raw bytes
pub const RAW_OBJECT_ID_LENGTH: usize = 20;

/// Length of abbreviated ids shown to users
pub const SHORT_OID_LENGTH: usize = 7;
