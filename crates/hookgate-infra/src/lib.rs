//! Infrastructure layer for hookgate.
//!
//! Contains implementations of the ports defined in `hookgate-core`:
//! SQLite storage for workflows and executions, the in-memory and SQLite
//! cache stores, and configuration loading.

pub mod config;
pub mod memory;
pub mod sqlite;
pub mod store;
