//! SQLite storage layer.
//!
//! Repository and cache store implementations backed by SQLite with WAL mode
//! and split read/write connection pools.

pub mod cache;
pub mod pool;
pub mod workflow;
