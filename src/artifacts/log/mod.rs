//! Commit history traversal
//!
//! - `rev_list`: commits reachable from a starting point, newest first
//! - `path_filter`: trie of path prefixes consulted while diffing trees

pub mod path_filter;
pub mod rev_list;
