//! Workflow domain types for hookgate.
//!
//! A workflow is a canvas of nodes joined by edges, as drawn in the visual
//! builder. It may be bound to one webhook (with an optional secret of its
//! own). Each triggering produces a `WorkflowExecution` record.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A stored workflow: metadata, webhook binding and canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// UUIDv7 assigned on first import.
    pub id: Uuid,
    /// Human-readable workflow name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Inactive workflows refuse to be triggered.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Webhook that triggers this workflow, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookBinding>,
    /// The node graph.
    #[serde(default)]
    pub canvas: CanvasDefinition,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl WorkflowDefinition {
    /// The workflow-specific webhook secret, ignoring empty values.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook
            .as_ref()
            .and_then(|w| w.secret.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// The bound webhook id, if any.
    pub fn webhook_id(&self) -> Option<&str> {
        self.webhook.as_ref().map(|w| w.id.as_str())
    }
}

/// 1:1 association between an opaque webhook id and a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookBinding {
    /// Opaque id used in `/api/v1/webhooks/{id}`.
    pub id: String,
    /// Per-webhook HMAC secret. Falls back to the global secret when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Nodes and edges of a workflow canvas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasDefinition {
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub edges: Vec<CanvasEdge>,
}

/// A single node on the canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasNode {
    /// Unique within the canvas.
    pub id: String,
    /// Node type, e.g. `trigger`, `condition`, `delay`, `data_transform`.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Node-specific configuration.
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl CanvasNode {
    /// Start nodes are `trigger`/`start` typed or flagged with `data.isStart`.
    pub fn is_start(&self) -> bool {
        matches!(self.node_type.as_str(), "trigger" | "start")
            || self.data.get("isStart").and_then(Value::as_bool) == Some(true)
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Overall status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExecutionStatus::Pending),
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            "cancelled" => Ok(ExecutionStatus::Cancelled),
            other => Err(format!("invalid execution status: '{other}'")),
        }
    }
}

/// What started an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Api,
    Webhook,
    Schedule,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Manual => "manual",
            TriggerType::Api => "api",
            TriggerType::Webhook => "webhook",
            TriggerType::Schedule => "schedule",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(TriggerType::Manual),
            "api" => Ok(TriggerType::Api),
            "webhook" => Ok(TriggerType::Webhook),
            "schedule" => Ok(TriggerType::Schedule),
            other => Err(format!("invalid trigger type: '{other}'")),
        }
    }
}

/// Result of a single node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeResult {
    pub success: bool,
    /// Object merged into the running context.
    pub output: Value,
    pub message: String,
}

/// Aggregate result of walking a canvas.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionOutcome {
    /// True iff no node failed.
    pub success: bool,
    pub node_results: BTreeMap<String, NodeResult>,
    pub node_errors: BTreeMap<String, String>,
    /// Node ids in processing order.
    pub processed_nodes: Vec<String>,
    /// Final merged context.
    pub context: Value,
}

/// A single execution of a workflow. Used for query results and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// UUIDv7 execution ID.
    pub id: Uuid,
    pub workflow_id: Uuid,
    /// Denormalized for display.
    pub workflow_name: String,
    pub status: ExecutionStatus,
    pub trigger_type: TriggerType,
    /// Trigger payload (e.g. decoded webhook body).
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ExecutionOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl WorkflowExecution {
    /// A fresh `pending` record for the given workflow.
    pub fn pending(workflow: &WorkflowDefinition, trigger_type: TriggerType, payload: Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            workflow_id: workflow.id,
            workflow_name: workflow.name.clone(),
            status: ExecutionStatus::Pending,
            trigger_type,
            payload,
            outcome: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
