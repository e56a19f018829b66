//! Core utilities and shared types
//!
//! - `lockfile`: exclusive-creation lock files with commit/rollback

pub mod lockfile;
