//! HTTP API layer for hookgate.
//!
//! Axum-based API at `/api/v1/`: the guarded webhook endpoint plus
//! execution status, cancellation and history.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
