//! Types and algorithms shared by the commands
//!
//! Nothing here owns a file under `.git` except through the areas it is
//! handed. Objects and index entries live in `objects`, `index` and
//! `database`; history walks in `log` and `merge`; tree comparison and line
//! diffs in `diff`; the workspace moves in `checkout`; ref names and
//! revision expressions in `branch`; `status` classifies local changes and
//! `core` holds the lock file every writer goes through.

pub mod branch;
pub mod checkout;
pub mod core;
pub mod database;
pub mod diff;
pub mod index;
pub mod log;
pub mod merge;
pub mod objects;
pub mod status;
