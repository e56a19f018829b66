//! Plumbing commands
//!
//! Direct access to objects, used by scripts and by the porcelain layer.
//!
//! - `cat-file`: print an object or its type
//! - `hash-object`: compute a blob id and optionally store the blob
//! - `ls-tree`: list the entries of a tree
//! - `write_commit`: tree and commit writing shared by `commit`, `merge` and `cherry-pick`

pub mod cat_file;
pub mod hash_object;
pub mod ls_tree;
pub mod write_commit;
