//! Node handlers.
//!
//! Every node type on a canvas is executed by a [`NodeHandler`]. The
//! [`NodeRegistry`] maps type names to handlers and comes pre-loaded with the
//! built-in types: `trigger`, `start`, `action`, `condition`, `delay` and
//! `data_transform`. Other types can be registered at wiring time.
//!
//! A handler receives a scratch copy of the running context. The engine keeps
//! the scratch copy (and merges `NodeResult::output` into it) only when the
//! node succeeds.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use hookgate_types::workflow::{CanvasNode, NodeResult};
use serde_json::{Map, Value, json};

use super::condition::{self, ConditionOperator};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised by a single node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("unknown node type: {0}")]
    UnknownType(String),

    #[error("invalid node configuration: {0}")]
    InvalidConfig(String),

    #[error("node execution failed: {0}")]
    Failed(String),
}

/// Executes one node type.
///
/// Object-safe so handlers of different types can share a registry.
pub trait NodeHandler: Send + Sync {
    fn execute<'a>(
        &'a self,
        node: &'a CanvasNode,
        context: &'a mut Map<String, Value>,
    ) -> BoxFuture<'a, Result<NodeResult, NodeError>>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Node type name -> handler.
#[derive(Clone)]
pub struct NodeRegistry {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
}

impl NodeRegistry {
    /// A registry with no handlers at all.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry with every built-in node type.
    pub fn with_builtins(max_delay: Duration) -> Self {
        let mut registry = Self::empty();
        let pass_through: Arc<dyn NodeHandler> = Arc::new(PassThroughNode);
        registry.register_arc("trigger", pass_through.clone());
        registry.register_arc("start", pass_through);
        registry.register("action", ActionNode);
        registry.register("condition", ConditionNode);
        registry.register("delay", DelayNode { max_delay });
        registry.register("data_transform", DataTransformNode);
        registry
    }

    /// Register (or replace) the handler for a node type.
    pub fn register<H: NodeHandler + 'static>(&mut self, node_type: &str, handler: H) {
        self.register_arc(node_type, Arc::new(handler));
    }

    pub fn register_arc(&mut self, node_type: &str, handler: Arc<dyn NodeHandler>) {
        self.handlers.insert(node_type.to_string(), handler);
    }

    pub fn get(&self, node_type: &str) -> Option<&Arc<dyn NodeHandler>> {
        self.handlers.get(node_type)
    }

    pub fn node_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

// ---------------------------------------------------------------------------
// Built-in handlers
// ---------------------------------------------------------------------------

fn done(output: Value, message: impl Into<String>) -> Result<NodeResult, NodeError> {
    Ok(NodeResult {
        success: true,
        output,
        message: message.into(),
    })
}

/// `trigger` / `start`: entry points, context unchanged.
struct PassThroughNode;

impl NodeHandler for PassThroughNode {
    fn execute<'a>(
        &'a self,
        node: &'a CanvasNode,
        _context: &'a mut Map<String, Value>,
    ) -> BoxFuture<'a, Result<NodeResult, NodeError>> {
        Box::pin(async move { done(json!({}), format!("{} node processed", node.node_type)) })
    }
}

/// `action`: generic action whose `data.output` object is merged into the context.
struct ActionNode;

impl NodeHandler for ActionNode {
    fn execute<'a>(
        &'a self,
        node: &'a CanvasNode,
        _context: &'a mut Map<String, Value>,
    ) -> BoxFuture<'a, Result<NodeResult, NodeError>> {
        Box::pin(async move {
            let output = match node.data.get("output") {
                None | Some(Value::Null) => json!({}),
                Some(Value::Object(map)) => Value::Object(map.clone()),
                Some(_) => {
                    return Err(NodeError::InvalidConfig(
                        "action output must be an object".to_string(),
                    ));
                }
            };
            let label = node
                .data
                .get("action")
                .and_then(Value::as_str)
                .unwrap_or("action");
            done(output, format!("{label} executed"))
        })
    }
}

/// `condition`: outputs `{"condition_result": bool}`.
struct ConditionNode;

impl NodeHandler for ConditionNode {
    fn execute<'a>(
        &'a self,
        node: &'a CanvasNode,
        context: &'a mut Map<String, Value>,
    ) -> BoxFuture<'a, Result<NodeResult, NodeError>> {
        Box::pin(async move {
            let field = node
                .data
                .get("condition")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let operator = match node.data.get("operator").and_then(Value::as_str) {
                Some(op) => op
                    .parse::<ConditionOperator>()
                    .map_err(NodeError::InvalidConfig)?,
                None => ConditionOperator::default(),
            };
            let expected = node.data.get("value").cloned().unwrap_or(Value::Null);

            let result = condition::evaluate(condition::lookup(context, field), operator, &expected);
            done(
                json!({ "condition_result": result }),
                format!("condition '{field} {operator}' evaluated to {result}"),
            )
        })
    }
}

/// `delay`: sleeps `data.delay` seconds, capped at `max_delay`.
struct DelayNode {
    max_delay: Duration,
}

impl NodeHandler for DelayNode {
    fn execute<'a>(
        &'a self,
        node: &'a CanvasNode,
        _context: &'a mut Map<String, Value>,
    ) -> BoxFuture<'a, Result<NodeResult, NodeError>> {
        Box::pin(async move {
            let requested = match node.data.get("delay") {
                None | Some(Value::Null) => 0.0,
                Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
                Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
                    NodeError::InvalidConfig(format!("delay must be a number, got '{s}'"))
                })?,
                Some(other) => {
                    return Err(NodeError::InvalidConfig(format!(
                        "delay must be a number, got {other}"
                    )));
                }
            };
            let secs = requested.clamp(0.0, self.max_delay.as_secs_f64());
            let delay = Duration::from_secs_f64(secs);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            done(
                json!({}),
                format!("delay of {} seconds completed", delay.as_secs_f64()),
            )
        })
    }
}

/// `data_transform`: removes `data.remove` keys, then merges `data.set`.
struct DataTransformNode;

impl NodeHandler for DataTransformNode {
    fn execute<'a>(
        &'a self,
        node: &'a CanvasNode,
        context: &'a mut Map<String, Value>,
    ) -> BoxFuture<'a, Result<NodeResult, NodeError>> {
        Box::pin(async move {
            let mut removed = 0;
            match node.data.get("remove") {
                None | Some(Value::Null) => {}
                Some(Value::Array(keys)) => {
                    for key in keys.iter().filter_map(Value::as_str) {
                        if context.remove(key).is_some() {
                            removed += 1;
                        }
                    }
                }
                Some(_) => {
                    return Err(NodeError::InvalidConfig(
                        "data_transform remove must be a list of keys".to_string(),
                    ));
                }
            }

            let set = match node.data.get("set") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(map)) => map.clone(),
                Some(_) => {
                    return Err(NodeError::InvalidConfig(
                        "data_transform set must be an object".to_string(),
                    ));
                }
            };
            let message = format!(
                "data transformation completed ({} set, {removed} removed)",
                set.len()
            );
            done(Value::Object(set), message)
        })
    }
}
