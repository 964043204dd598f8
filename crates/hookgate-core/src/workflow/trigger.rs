//! Trigger service: turns an admitted trigger into a recorded execution.
//!
//! `submit` persists a `pending` execution and runs it on a background task;
//! `run` does the same inline. Either way the record moves
//! `pending -> running -> completed | failed | cancelled`.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use hookgate_types::error::RepositoryError;
use hookgate_types::workflow::{
    ExecutionStatus, TriggerType, WorkflowDefinition, WorkflowExecution,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::repository::WorkflowRepository;

use super::engine::{CanvasEngine, EngineError};
use super::validation::{ValidationError, validate_workflow};

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Unknown execution, or one that is no longer running.
    #[error("execution not found or not running: {0}")]
    NotFound(Uuid),
}

pub struct TriggerService<R: WorkflowRepository> {
    repo: Arc<R>,
    engine: Arc<CanvasEngine>,
    /// Cancellation tokens of in-flight runs, keyed by execution id.
    running: Arc<DashMap<Uuid, CancellationToken>>,
}

impl<R: WorkflowRepository + 'static> TriggerService<R> {
    pub fn new(repo: Arc<R>, engine: Arc<CanvasEngine>) -> Self {
        Self {
            repo,
            engine,
            running: Arc::new(DashMap::new()),
        }
    }

    /// Validate, persist a pending execution and run it in the background.
    pub async fn submit(
        &self,
        workflow: WorkflowDefinition,
        payload: Value,
        trigger_type: TriggerType,
    ) -> Result<WorkflowExecution, TriggerError> {
        let (execution, token) = self.prepare(&workflow, payload, trigger_type).await?;
        let pending = execution.clone();

        let repo = self.repo.clone();
        let engine = self.engine.clone();
        let running = self.running.clone();
        tokio::spawn(async move {
            let execution_id = execution.id;
            if let Err(e) = execute_and_record(&*repo, &engine, &workflow, execution, &token).await {
                tracing::error!(
                    execution_id = %execution_id,
                    workflow_id = %workflow.id,
                    error = %e,
                    "failed to record workflow execution"
                );
            }
            running.remove(&execution_id);
        });

        Ok(pending)
    }

    /// Validate and run to completion, returning the final record.
    pub async fn run(
        &self,
        workflow: &WorkflowDefinition,
        payload: Value,
        trigger_type: TriggerType,
    ) -> Result<WorkflowExecution, TriggerError> {
        let (execution, token) = self.prepare(workflow, payload, trigger_type).await?;
        let execution_id = execution.id;
        let result = execute_and_record(&*self.repo, &self.engine, workflow, execution, &token).await;
        self.running.remove(&execution_id);
        Ok(result?)
    }

    /// Request cancellation of an in-flight run.
    pub fn cancel(&self, execution_id: Uuid) -> Result<(), TriggerError> {
        match self.running.remove(&execution_id) {
            Some((_, token)) => {
                token.cancel();
                tracing::info!(execution_id = %execution_id, "workflow execution cancellation requested");
                Ok(())
            }
            None => Err(TriggerError::NotFound(execution_id)),
        }
    }

    pub fn is_running(&self, execution_id: &Uuid) -> bool {
        self.running.contains_key(execution_id)
    }

    /// Cancel every in-flight run (used on shutdown).
    pub fn cancel_all(&self) {
        for entry in self.running.iter() {
            entry.value().cancel();
        }
        self.running.clear();
    }

    async fn prepare(
        &self,
        workflow: &WorkflowDefinition,
        payload: Value,
        trigger_type: TriggerType,
    ) -> Result<(WorkflowExecution, CancellationToken), TriggerError> {
        if let Err(e) = validate_workflow(workflow) {
            tracing::warn!(workflow_id = %workflow.id, error = %e, "refusing to run invalid workflow");
            return Err(e.into());
        }

        let execution = WorkflowExecution::pending(workflow, trigger_type, payload);
        self.repo.create_execution(&execution).await?;

        let token = CancellationToken::new();
        self.running.insert(execution.id, token.clone());

        tracing::info!(
            execution_id = %execution.id,
            workflow_id = %workflow.id,
            trigger_type = %trigger_type,
            "workflow execution created"
        );
        Ok((execution, token))
    }
}

/// Run the canvas and persist each status change.
///
/// When a status write fails the record is marked `failed` on a best-effort
/// basis, so it never stays `pending` or `running` without a live run.
async fn execute_and_record<R: WorkflowRepository>(
    repo: &R,
    engine: &CanvasEngine,
    workflow: &WorkflowDefinition,
    execution: WorkflowExecution,
    token: &CancellationToken,
) -> Result<WorkflowExecution, RepositoryError> {
    let fallback = execution.clone();
    match record_run(repo, engine, workflow, execution, token).await {
        Ok(done) => Ok(done),
        Err(e) => {
            mark_failed(repo, fallback, &e).await;
            Err(e)
        }
    }
}

async fn mark_failed<R: WorkflowRepository>(
    repo: &R,
    mut execution: WorkflowExecution,
    cause: &RepositoryError,
) {
    let completed_at = Utc::now();
    execution.status = ExecutionStatus::Failed;
    execution.error = Some(format!("failed to record execution: {cause}"));
    let elapsed = completed_at - execution.started_at;
    execution.duration_ms = u64::try_from(elapsed.num_milliseconds()).ok();
    execution.completed_at = Some(completed_at);

    if let Err(e) = repo.update_execution(&execution).await {
        tracing::error!(
            execution_id = %execution.id,
            error = %e,
            "could not mark execution as failed"
        );
    }
}

async fn record_run<R: WorkflowRepository>(
    repo: &R,
    engine: &CanvasEngine,
    workflow: &WorkflowDefinition,
    mut execution: WorkflowExecution,
    token: &CancellationToken,
) -> Result<WorkflowExecution, RepositoryError> {
    execution.status = ExecutionStatus::Running;
    repo.update_execution(&execution).await?;

    let started = Instant::now();
    let result = engine
        .execute(workflow, execution.payload.clone(), token)
        .await;

    match result {
        Ok(outcome) => {
            if outcome.success {
                execution.status = ExecutionStatus::Completed;
            } else {
                execution.status = ExecutionStatus::Failed;
                let failed: Vec<&str> = outcome.node_errors.keys().map(String::as_str).collect();
                execution.error = Some(format!("node(s) failed: {}", failed.join(", ")));
            }
            execution.outcome = Some(outcome);
        }
        Err(EngineError::Cancelled) => {
            execution.status = ExecutionStatus::Cancelled;
            execution.error = Some("cancelled".to_string());
        }
        Err(e) => {
            execution.status = ExecutionStatus::Failed;
            execution.error = Some(e.to_string());
        }
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    execution.completed_at = Some(Utc::now());
    execution.duration_ms = Some(duration_ms);
    repo.update_execution(&execution).await?;

    tracing::info!(
        execution_id = %execution.id,
        workflow_id = %workflow.id,
        status = %execution.status,
        duration_ms,
        "workflow execution finished"
    );
    Ok(execution)
}
