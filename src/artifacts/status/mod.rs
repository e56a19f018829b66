//! Comparing `HEAD`, the index and the workspace
//!
//! `inspector` answers per-path questions such as whether a file changed
//! since it was staged. `status_info` walks the repository and collects the
//! answers. The outcomes and their labels live in `file_change`.

pub mod file_change;
pub mod inspector;
pub mod status_info;
