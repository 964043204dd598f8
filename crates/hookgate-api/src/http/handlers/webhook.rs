//! Guarded webhook endpoint.
//!
//! - POST /api/v1/webhooks/{webhook_id} - verify, rate-limit and trigger the bound workflow

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use hookgate_core::webhook::IngressRequest;
use hookgate_types::webhook::SIGNATURE_HEADERS;
use hookgate_types::workflow::TriggerType;

use crate::http::error::{AppError, apply_rate_limit_headers};
use crate::http::extractors::body::RawBody;
use crate::http::extractors::client_ip::ClientIp;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// First signature header present, in [`SIGNATURE_HEADERS`] order.
///
/// A header with non-UTF-8 bytes still counts as present so that it fails
/// verification instead of being treated as unsigned.
pub fn signature_header(headers: &HeaderMap) -> Option<String> {
    SIGNATURE_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    })
}

/// POST /api/v1/webhooks/{webhook_id} - Trigger a workflow from a webhook.
///
/// The body is hashed exactly as received; it is only parsed after the
/// signature check passes.
#[tracing::instrument(
    name = "receive_webhook",
    skip_all,
    fields(webhook_id = %webhook_id, client_ip = %client_ip)
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    ClientIp(client_ip): ClientIp,
    headers: HeaderMap,
    RawBody(body): RawBody,
) -> Result<Response, AppError> {
    let signature = signature_header(&headers);
    let request = IngressRequest {
        webhook_id: &webhook_id,
        client_ip: &client_ip,
        signature: signature.as_deref(),
        body: &body,
    };
    admit_and_trigger(&state, request)
        .await
        .inspect_err(AppError::log)
}

async fn admit_and_trigger(
    state: &AppState,
    request: IngressRequest<'_>,
) -> Result<Response, AppError> {
    let admitted = state.ingress.admit(request).await?;

    let rate_limit = admitted.rate_limit;
    let execution = state
        .trigger
        .submit(admitted.workflow, admitted.payload, TriggerType::Webhook)
        .await?;

    tracing::info!(
        execution_id = %execution.id,
        workflow_id = %execution.workflow_id,
        "workflow triggered by webhook"
    );

    let data = json!({
        "execution_id": execution.id,
        "workflow_id": execution.workflow_id,
        "workflow_name": execution.workflow_name,
        "status": execution.status,
    });
    let mut response = ApiResponse::success("Workflow triggered", data).into_response();
    apply_rate_limit_headers(response.headers_mut(), &rate_limit);
    Ok(response)
}
