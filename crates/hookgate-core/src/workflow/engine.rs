//! Canvas engine: breadth-first walk of a workflow's node graph.
//!
//! # Execution flow
//!
//! 1. Seed the queue with every start node, in canvas order.
//! 2. Pop a node; skip it if it was already visited (this breaks cycles).
//! 3. Run its handler against a scratch copy of the context.
//! 4. On success, keep the scratch copy, merge the node's output object and
//!    enqueue the node's successors. On failure, record the error and do not
//!    follow its edges.
//! 5. The run succeeds iff no node failed.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use hookgate_types::config::EngineSettings;
use hookgate_types::workflow::{CanvasNode, ExecutionOutcome, WorkflowDefinition};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use super::node::{NodeError, NodeRegistry};

/// Errors that abort a whole run (as opposed to per-node failures, which are
/// reported in the outcome).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no start nodes found in workflow")]
    NoStartNodes,

    #[error("workflow timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("workflow cancelled")]
    Cancelled,
}

pub struct CanvasEngine {
    registry: Arc<NodeRegistry>,
    timeout: Duration,
}

impl CanvasEngine {
    pub fn new(registry: NodeRegistry, timeout: Duration) -> Self {
        Self {
            registry: Arc::new(registry),
            timeout,
        }
    }

    /// Engine with the built-in node types and limits from configuration.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(
            NodeRegistry::with_builtins(Duration::from_secs(settings.max_delay_secs)),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Execute a workflow's canvas with the given trigger payload.
    pub async fn execute(
        &self,
        workflow: &WorkflowDefinition,
        payload: Value,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome, EngineError> {
        let nodes = &workflow.canvas.nodes;
        if !nodes.iter().any(CanvasNode::is_start) {
            return Err(EngineError::NoStartNodes);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(workflow_id = %workflow.id, "workflow run cancelled");
                Err(EngineError::Cancelled)
            }
            result = tokio::time::timeout(self.timeout, self.walk(workflow, payload)) => {
                result.map_err(|_| {
                    tracing::warn!(
                        workflow_id = %workflow.id,
                        timeout_secs = self.timeout.as_secs(),
                        "workflow run timed out"
                    );
                    EngineError::Timeout(self.timeout)
                })
            }
        }
    }

    async fn walk(&self, workflow: &WorkflowDefinition, payload: Value) -> ExecutionOutcome {
        let nodes = &workflow.canvas.nodes;
        let by_id: HashMap<&str, &CanvasNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &workflow.canvas.edges {
            successors
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }

        let mut context = initial_context(payload);
        let mut node_results = BTreeMap::new();
        let mut node_errors = BTreeMap::new();
        let mut processed_nodes = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&CanvasNode> = nodes.iter().filter(|n| n.is_start()).collect();

        while let Some(node) = queue.pop_front() {
            if !visited.insert(node.id.as_str()) {
                continue;
            }

            let Some(handler) = self.registry.get(&node.node_type) else {
                let err = NodeError::UnknownType(node.node_type.clone());
                tracing::warn!(node_id = %node.id, node_type = %node.node_type, "{err}");
                node_errors.insert(node.id.clone(), err.to_string());
                continue;
            };

            let mut scratch = context.clone();
            match handler.execute(node, &mut scratch).await {
                Ok(result) if result.success => {
                    context = scratch;
                    if let Value::Object(output) = &result.output {
                        for (key, value) in output {
                            context.insert(key.clone(), value.clone());
                        }
                    }
                    tracing::debug!(node_id = %node.id, node_type = %node.node_type, "node completed");
                    node_results.insert(node.id.clone(), result);
                    processed_nodes.push(node.id.clone());

                    if let Some(targets) = successors.get(node.id.as_str()) {
                        queue.extend(targets.iter().filter_map(|t| by_id.get(t).copied()));
                    }
                }
                Ok(result) => {
                    tracing::warn!(
                        node_id = %node.id,
                        node_type = %node.node_type,
                        message = %result.message,
                        "node reported failure"
                    );
                    node_errors.insert(node.id.clone(), result.message.clone());
                    node_results.insert(node.id.clone(), result);
                }
                Err(err) => {
                    tracing::warn!(
                        node_id = %node.id,
                        node_type = %node.node_type,
                        error = %err,
                        "node failed"
                    );
                    node_errors.insert(node.id.clone(), err.to_string());
                }
            }
        }

        ExecutionOutcome {
            success: node_errors.is_empty(),
            node_results,
            node_errors,
            processed_nodes,
            context: Value::Object(context),
        }
    }
}

/// Object payloads are the context; anything else is wrapped as `{"payload": v}`.
fn initial_context(payload: Value) -> Map<String, Value> {
    match payload {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("payload".to_string(), other);
            map
        }
    }
}
