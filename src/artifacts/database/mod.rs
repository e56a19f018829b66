//! Entries as read back from the object database

pub mod database_entry;
