//! SQLite workflow repository implementation.
//!
//! Implements `WorkflowRepository` from `hookgate-core` using sqlx with split
//! read/write pools. Workflow definitions are stored as JSON blobs next to the
//! columns used for lookups (`webhook_id`, `is_active`). Executions keep their
//! payload and outcome as JSON text.

use chrono::{DateTime, Utc};
use hookgate_core::repository::WorkflowRepository;
use hookgate_types::error::RepositoryError;
use hookgate_types::workflow::{
    ExecutionOutcome, ExecutionStatus, TriggerType, WorkflowDefinition, WorkflowExecution,
};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `WorkflowRepository`.
pub struct SqliteWorkflowRepository {
    pool: DatabasePool,
}

impl SqliteWorkflowRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct WorkflowDefRow {
    definition: String,
}

impl WorkflowDefRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            definition: row.try_get("definition")?,
        })
    }

    fn into_definition(self) -> Result<WorkflowDefinition, RepositoryError> {
        serde_json::from_str(&self.definition)
            .map_err(|e| RepositoryError::Query(format!("invalid workflow definition JSON: {e}")))
    }
}

struct ExecutionRow {
    id: String,
    workflow_id: String,
    workflow_name: String,
    status: String,
    trigger_type: String,
    payload: String,
    outcome: Option<String>,
    error: Option<String>,
    started_at: String,
    completed_at: Option<String>,
    duration_ms: Option<i64>,
}

impl ExecutionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            workflow_name: row.try_get("workflow_name")?,
            status: row.try_get("status")?,
            trigger_type: row.try_get("trigger_type")?,
            payload: row.try_get("payload")?,
            outcome: row.try_get("outcome")?,
            error: row.try_get("error")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            duration_ms: row.try_get("duration_ms")?,
        })
    }

    fn into_execution(self) -> Result<WorkflowExecution, RepositoryError> {
        let status: ExecutionStatus = self.status.parse().map_err(RepositoryError::Query)?;
        let trigger_type: TriggerType = self.trigger_type.parse().map_err(RepositoryError::Query)?;

        let payload: serde_json::Value = serde_json::from_str(&self.payload)
            .map_err(|e| RepositoryError::Query(format!("invalid payload JSON: {e}")))?;

        let outcome = self
            .outcome
            .as_deref()
            .map(|s| {
                serde_json::from_str::<ExecutionOutcome>(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid outcome JSON: {e}")))
            })
            .transpose()?;

        Ok(WorkflowExecution {
            id: parse_uuid(&self.id)?,
            workflow_id: parse_uuid(&self.workflow_id)?,
            workflow_name: self.workflow_name,
            status,
            trigger_type,
            payload,
            outcome,
            error: self.error,
            started_at: parse_datetime(&self.started_at)?,
            completed_at: self
                .completed_at
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
            duration_ms: self.duration_ms.map(|ms| ms.max(0) as u64),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Query(format!("serialize: {e}")))
}

const EXECUTION_COLUMNS: &str = "id, workflow_id, workflow_name, status, trigger_type, payload, \
     outcome, error, started_at, completed_at, duration_ms";

// ---------------------------------------------------------------------------
// WorkflowRepository impl
// ---------------------------------------------------------------------------

impl WorkflowRepository for SqliteWorkflowRepository {
    async fn save_workflow(&self, def: &WorkflowDefinition) -> Result<(), RepositoryError> {
        let definition_json = to_json(def)?;

        sqlx::query(
            r#"INSERT INTO workflows (id, name, webhook_id, is_active, definition, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 webhook_id = excluded.webhook_id,
                 is_active = excluded.is_active,
                 definition = excluded.definition,
                 updated_at = excluded.updated_at"#,
        )
        .bind(def.id.to_string())
        .bind(&def.name)
        .bind(def.webhook_id())
        .bind(def.is_active)
        .bind(&definition_json)
        .bind(format_datetime(&def.created_at))
        .bind(format_datetime(&def.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(
                format!(
                    "webhook id '{}' is already bound to another workflow",
                    def.webhook_id().unwrap_or_default()
                ),
            ),
            other => RepositoryError::Query(other.to_string()),
        })?;

        Ok(())
    }

    async fn get_workflow(&self, id: &Uuid) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        let row = sqlx::query("SELECT definition FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = WorkflowDefRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_definition()?))
            }
            None => Ok(None),
        }
    }

    async fn find_by_webhook(
        &self,
        webhook_id: &str,
    ) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        let row = sqlx::query("SELECT definition FROM workflows WHERE webhook_id = ?")
            .bind(webhook_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = WorkflowDefRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_definition()?))
            }
            None => Ok(None),
        }
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>, RepositoryError> {
        let rows = sqlx::query("SELECT definition FROM workflows ORDER BY name ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut defs = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = WorkflowDefRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            defs.push(r.into_definition()?);
        }
        Ok(defs)
    }

    async fn delete_workflow(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_execution(&self, execution: &WorkflowExecution) -> Result<(), RepositoryError> {
        let outcome = execution.outcome.as_ref().map(to_json).transpose()?;

        sqlx::query(
            r#"INSERT INTO workflow_executions
               (id, workflow_id, workflow_name, status, trigger_type, payload,
                outcome, error, started_at, completed_at, duration_ms)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(execution.id.to_string())
        .bind(execution.workflow_id.to_string())
        .bind(&execution.workflow_name)
        .bind(execution.status.as_str())
        .bind(execution.trigger_type.as_str())
        .bind(to_json(&execution.payload)?)
        .bind(&outcome)
        .bind(&execution.error)
        .bind(format_datetime(&execution.started_at))
        .bind(execution.completed_at.as_ref().map(format_datetime))
        .bind(execution.duration_ms.map(|ms| ms as i64))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn update_execution(&self, execution: &WorkflowExecution) -> Result<(), RepositoryError> {
        let outcome = execution.outcome.as_ref().map(to_json).transpose()?;

        let result = sqlx::query(
            r#"UPDATE workflow_executions
               SET status = ?, outcome = ?, error = ?, completed_at = ?, duration_ms = ?
               WHERE id = ?"#,
        )
        .bind(execution.status.as_str())
        .bind(&outcome)
        .bind(&execution.error)
        .bind(execution.completed_at.as_ref().map(format_datetime))
        .bind(execution.duration_ms.map(|ms| ms as i64))
        .bind(execution.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_execution(&self, id: &Uuid) -> Result<Option<WorkflowExecution>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {EXECUTION_COLUMNS} FROM workflow_executions WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = ExecutionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_execution()?))
            }
            None => Ok(None),
        }
    }

    async fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<WorkflowExecution>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {EXECUTION_COLUMNS} FROM workflow_executions \
             WHERE workflow_id = ? ORDER BY started_at DESC, id DESC LIMIT ?"
        ))
        .bind(workflow_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut executions = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = ExecutionRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            executions.push(r.into_execution()?);
        }
        Ok(executions)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
