//! Execution status, cancellation and history handlers.
//!
//! Endpoints:
//! - GET  /api/v1/executions/{id}                - Execution record
//! - POST /api/v1/executions/{id}/cancel         - Cancel a running execution
//! - GET  /api/v1/workflows/{id}/executions      - Recent executions of a workflow

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use hookgate_core::repository::WorkflowRepository;
use hookgate_types::workflow::WorkflowExecution;

use crate::http::error::AppError;
use crate::http::extractors::query::ApiQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for execution history.
#[derive(Debug, Deserialize)]
pub struct ExecutionListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

const MAX_LIMIT: u32 = 100;

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::BadRequest(format!("Invalid UUID: {s}")))
}

/// GET /api/v1/executions/{id} - Get a single execution.
#[tracing::instrument(skip_all, fields(execution_id = %id))]
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WorkflowExecution>>, AppError> {
    let result = async {
        let id = parse_uuid(&id)?;
        let execution = state
            .repo
            .get_execution(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Execution not found: {id}")))?;
        Ok::<_, AppError>(Json(ApiResponse::success("Execution found", execution)))
    };
    result.await.inspect_err(AppError::log)
}

/// POST /api/v1/executions/{id}/cancel - Request cancellation of a running execution.
#[tracing::instrument(skip_all, fields(execution_id = %id))]
pub async fn cancel_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let id = parse_uuid(&id).inspect_err(AppError::log)?;
    state
        .trigger
        .cancel(id)
        .map_err(AppError::from)
        .inspect_err(AppError::log)?;

    Ok(Json(ApiResponse::success(
        "Cancellation requested",
        json!({ "execution_id": id }),
    )))
}

/// GET /api/v1/workflows/{id}/executions - Recent executions, newest first.
#[tracing::instrument(skip_all, fields(workflow_id = %workflow_id))]
pub async fn list_executions(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    ApiQuery(query): ApiQuery<ExecutionListQuery>,
) -> Result<Json<ApiResponse<Vec<WorkflowExecution>>>, AppError> {
    let result = async {
        let workflow_id = parse_uuid(&workflow_id)?;
        if state.repo.get_workflow(&workflow_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Workflow not found: {workflow_id}")));
        }

        let limit = query.limit.clamp(1, MAX_LIMIT);
        let executions = state.repo.list_executions(&workflow_id, limit).await?;

        Ok::<_, AppError>(Json(ApiResponse::success(
            format!("{} execution(s)", executions.len()),
            executions,
        )))
    };
    result.await.inspect_err(AppError::log)
}
