//! SQLite storage layer.
//!
//! Local-development session store backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod chat;
pub mod pool;
