//! Business logic and port definitions for hookgate.
//!
//! This crate defines the "ports" (repository and cache store traits) that the
//! infrastructure layer implements, the webhook ingress guard built on top of
//! them, and the canvas engine that runs admitted workflows. It depends only on
//! `hookgate-types` -- never on `hookgate-infra` or any database crate.

pub mod repository;
pub mod store;
pub mod webhook;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
