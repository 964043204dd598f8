//! Shared domain types for hookgate.
//!
//! This crate contains the domain types used across the workspace: workflow
//! canvas definitions, execution records, gateway configuration and the
//! storage-level error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod webhook;
pub mod workflow;
