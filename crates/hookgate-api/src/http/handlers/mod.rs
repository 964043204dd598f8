//! HTTP request handlers.

pub mod execution;
pub mod webhook;
