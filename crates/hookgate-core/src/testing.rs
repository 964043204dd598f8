//! In-process mocks of the core ports, shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use hookgate_types::error::{RepositoryError, StoreError};
use hookgate_types::workflow::{
    CanvasDefinition, CanvasEdge, CanvasNode, WebhookBinding, WorkflowDefinition,
    WorkflowExecution,
};
use serde_json::{Value, json};
use tokio::time::Instant;
use uuid::Uuid;

use crate::repository::WorkflowRepository;
use crate::store::{CacheStore, CounterState};

// ---------------------------------------------------------------------------
// Cache store
// ---------------------------------------------------------------------------

struct MockEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MockEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// HashMap-backed cache store on tokio's clock, so paused-time tests work.
/// Clones share the same entries.
#[derive(Default, Clone)]
pub struct MockCacheStore {
    entries: Arc<Mutex<HashMap<String, MockEntry>>>,
}

impl MockCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .is_some_and(|e| e.is_live(now))
    }
}

impl CacheStore for MockCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.lock().unwrap().insert(
            key.to_string(),
            MockEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<CounterState, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(key.to_string()).or_insert(MockEntry {
            value: "0".to_string(),
            expires_at: Some(now + window),
        });
        if !entry.is_live(now) {
            entry.value = "0".to_string();
            entry.expires_at = Some(now + window);
        }
        let count: u64 = entry.value.parse().map_err(|_| StoreError::NotACounter {
            key: key.to_string(),
        })?;
        let count = count + 1;
        entry.value = count.to_string();
        let expires_at = *entry.expires_at.get_or_insert(now + window);
        Ok(CounterState {
            count,
            ttl: expires_at.saturating_duration_since(now),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        Ok((before - entries.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Workflow repository
// ---------------------------------------------------------------------------

/// HashMap-backed repository that counts webhook lookups and can be told to
/// fail execution updates.
#[derive(Default)]
pub struct MockWorkflowRepository {
    workflows: Mutex<HashMap<Uuid, WorkflowDefinition>>,
    executions: Mutex<HashMap<Uuid, WorkflowExecution>>,
    webhook_lookups: AtomicUsize,
    failing_updates: AtomicUsize,
}

impl MockWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(def: WorkflowDefinition) -> Self {
        let repo = Self::new();
        repo.workflows.lock().unwrap().insert(def.id, def);
        repo
    }

    pub fn webhook_lookups(&self) -> usize {
        self.webhook_lookups.load(Ordering::SeqCst)
    }

    /// Make the next `n` calls to `update_execution` fail.
    pub fn fail_next_updates(&self, n: usize) {
        self.failing_updates.store(n, Ordering::SeqCst);
    }
}

impl WorkflowRepository for MockWorkflowRepository {
    async fn save_workflow(&self, def: &WorkflowDefinition) -> Result<(), RepositoryError> {
        self.workflows.lock().unwrap().insert(def.id, def.clone());
        Ok(())
    }

    async fn get_workflow(&self, id: &Uuid) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        Ok(self.workflows.lock().unwrap().get(id).cloned())
    }

    async fn find_by_webhook(
        &self,
        webhook_id: &str,
    ) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        self.webhook_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .workflows
            .lock()
            .unwrap()
            .values()
            .find(|w| w.webhook_id() == Some(webhook_id))
            .cloned())
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>, RepositoryError> {
        Ok(self.workflows.lock().unwrap().values().cloned().collect())
    }

    async fn delete_workflow(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        Ok(self.workflows.lock().unwrap().remove(id).is_some())
    }

    async fn create_execution(&self, execution: &WorkflowExecution) -> Result<(), RepositoryError> {
        self.executions
            .lock()
            .unwrap()
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn update_execution(&self, execution: &WorkflowExecution) -> Result<(), RepositoryError> {
        let failing = self
            .failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(RepositoryError::Query("database is locked".to_string()));
        }

        let mut executions = self.executions.lock().unwrap();
        match executions.get_mut(&execution.id) {
            Some(existing) => {
                *existing = execution.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn get_execution(&self, id: &Uuid) -> Result<Option<WorkflowExecution>, RepositoryError> {
        Ok(self.executions.lock().unwrap().get(id).cloned())
    }

    async fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<WorkflowExecution>, RepositoryError> {
        let mut list: Vec<_> = self
            .executions
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.workflow_id == *workflow_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        list.truncate(limit as usize);
        Ok(list)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn node(id: &str, node_type: &str, data: Value) -> CanvasNode {
    CanvasNode {
        id: id.to_string(),
        node_type: node_type.to_string(),
        data,
    }
}

pub fn edge(source: &str, target: &str) -> CanvasEdge {
    CanvasEdge {
        id: None,
        source: source.to_string(),
        target: target.to_string(),
    }
}

pub fn workflow(nodes: Vec<CanvasNode>, edges: Vec<CanvasEdge>) -> WorkflowDefinition {
    let now = Utc::now();
    WorkflowDefinition {
        id: Uuid::now_v7(),
        name: "test-workflow".to_string(),
        description: None,
        is_active: true,
        webhook: None,
        canvas: CanvasDefinition { nodes, edges },
        created_at: now,
        updated_at: now,
    }
}

/// Trigger -> action workflow bound to `webhook_id`.
pub fn webhook_workflow(webhook_id: &str, secret: Option<&str>) -> WorkflowDefinition {
    let mut def = workflow(
        vec![
            node("start", "trigger", json!({})),
            node("act", "action", json!({ "output": { "handled": true } })),
        ],
        vec![edge("start", "act")],
    );
    def.webhook = Some(WebhookBinding {
        id: webhook_id.to_string(),
        secret: secret.map(str::to_string),
    });
    def
}
