//! Moving the workspace and index from one tree to another
//!
//! - `migration`: plans a tree diff as creates, updates and deletes, checks
//!   it against local changes and applies it
//! - `conflict`: the classes of local changes that block a migration and
//!   the report listing them
//!
//! Checkout, merge, reset and cherry-pick all go through a migration.

pub mod conflict;
pub mod migration;
