//! Workflow repository trait definition.
//!
//! Covers workflow definitions (looked up by id or by bound webhook id) and
//! their execution records.

use hookgate_types::error::RepositoryError;
use hookgate_types::workflow::{WorkflowDefinition, WorkflowExecution};
use uuid::Uuid;

/// Repository trait for workflow persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait WorkflowRepository: Send + Sync {
    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    /// Upsert a workflow definition (insert or replace by ID).
    ///
    /// Returns `RepositoryError::Conflict` if another workflow already owns
    /// the same webhook id.
    fn save_workflow(
        &self,
        def: &WorkflowDefinition,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a workflow definition by its UUID.
    fn get_workflow(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowDefinition>, RepositoryError>> + Send;

    /// Get the workflow bound to a webhook id.
    fn find_by_webhook(
        &self,
        webhook_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowDefinition>, RepositoryError>> + Send;

    /// List all workflow definitions, ordered by name.
    fn list_workflows(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowDefinition>, RepositoryError>> + Send;

    /// Delete a workflow definition (and its executions). Returns `true` if it existed.
    fn delete_workflow(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Executions
    // -----------------------------------------------------------------------

    /// Create a new execution record.
    fn create_execution(
        &self,
        execution: &WorkflowExecution,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite the mutable fields (status, outcome, error, timings) of an
    /// existing execution. `RepositoryError::NotFound` if it does not exist.
    fn update_execution(
        &self,
        execution: &WorkflowExecution,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get an execution by its UUID.
    fn get_execution(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowExecution>, RepositoryError>> + Send;

    /// List executions for a workflow, newest first.
    fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<WorkflowExecution>, RepositoryError>> + Send;
}
