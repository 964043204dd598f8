//! Canvas workflow execution.
//!
//! - `validation` -- structural checks run before any execution
//! - `condition` -- operator evaluation for `condition` nodes
//! - `node` -- `NodeHandler` trait, handler registry and built-in node types
//! - `engine` -- breadth-first canvas walk with context merging
//! - `trigger` -- execution records, background runs and cancellation

pub mod condition;
pub mod engine;
pub mod node;
pub mod trigger;
pub mod validation;

pub use engine::{CanvasEngine, EngineError};
pub use node::{NodeError, NodeHandler, NodeRegistry};
pub use trigger::{TriggerError, TriggerService};
pub use validation::{ValidationError, validate_workflow};
