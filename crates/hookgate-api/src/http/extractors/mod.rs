//! Custom axum extractors.

pub mod body;
pub mod client_ip;
pub mod query;
