//! Application error type mapping to HTTP status codes and envelope format.
//!
//! Client-facing messages never carry internal error text. The underlying
//! error is attached to the response as an [`ErrorReport`] extension and
//! only copied into the body by [`expose_error_detail`] when `debug = true`.
//!
//! Handlers call [`AppError::log`] before returning, while their span (and its
//! `webhook_id` / `execution_id` fields) is still entered.

use std::time::Duration;

use axum::Json;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use hookgate_core::webhook::{RateLimitDecision, WebhookError};
use hookgate_core::workflow::TriggerError;
use hookgate_types::error::RepositoryError;

use crate::http::response::ErrorEnvelope;
use crate::state::AppState;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Refused by the webhook guard.
    Webhook(WebhookError),
    /// Failed to start or cancel an execution.
    Trigger(TriggerError),
    /// Storage failure outside the guard.
    Repository(RepositoryError),
    /// Unknown resource.
    NotFound(String),
    /// Malformed request.
    BadRequest(String),
    /// Rejected by one of axum's extractors, or no matching route.
    Rejected { status: StatusCode, message: String },
}

impl From<WebhookError> for AppError {
    fn from(e: WebhookError) -> Self {
        AppError::Webhook(e)
    }
}

impl From<TriggerError> for AppError {
    fn from(e: TriggerError) -> Self {
        AppError::Trigger(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// Underlying error text, carried as a response extension.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub message: String,
    pub detail: String,
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Webhook(e) => match e {
                WebhookError::RateLimited { .. } => {
                    (StatusCode::TOO_MANY_REQUESTS, "Too many requests".to_string())
                }
                WebhookError::MissingSignature
                | WebhookError::SecretUnavailable(_)
                | WebhookError::InvalidSignature => {
                    (StatusCode::FORBIDDEN, "Invalid webhook signature".to_string())
                }
                WebhookError::WebhookNotFound(_) => {
                    (StatusCode::NOT_FOUND, "Webhook not found".to_string())
                }
                WebhookError::WorkflowInactive(_) => {
                    (StatusCode::CONFLICT, "Workflow is not active".to_string())
                }
                WebhookError::InvalidKey(_) | WebhookError::Store(_) | WebhookError::Repository(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
                }
            },
            AppError::Trigger(e) => match e {
                TriggerError::Validation(v) => (StatusCode::UNPROCESSABLE_ENTITY, v.to_string()),
                TriggerError::NotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "Execution not found or not running".to_string(),
                ),
                TriggerError::Repository(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
                }
            },
            AppError::Repository(RepositoryError::NotFound) => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            AppError::Repository(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Rejected { status, message } => (*status, message.clone()),
        }
    }

    fn detail(&self) -> String {
        match self {
            AppError::Webhook(e) => e.to_string(),
            AppError::Trigger(e) => e.to_string(),
            AppError::Repository(e) => e.to_string(),
            AppError::NotFound(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::Rejected { message, .. } => message.clone(),
        }
    }

    /// Emit the error in the caller's span: `error` for 5xx, `debug` otherwise.
    pub fn log(&self) {
        let (status, _) = self.status_and_message();
        let detail = self.detail();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %detail, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %detail, "request rejected");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let detail = self.detail();

        let mut response = (status, Json(ErrorEnvelope::new(message.clone(), None))).into_response();

        if let AppError::Webhook(WebhookError::RateLimited {
            limit, retry_after, ..
        }) = &self
        {
            let headers = response.headers_mut();
            set_header(headers, "retry-after", retry_after_secs(*retry_after));
            set_header(headers, "x-ratelimit-limit", u64::from(*limit));
            set_header(headers, "x-ratelimit-remaining", 0);
        }

        response
            .extensions_mut()
            .insert(ErrorReport { message, detail });
        response
    }
}

/// Add `X-RateLimit-*` headers describing an allowed request.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    if let RateLimitDecision::Allowed {
        limit,
        remaining,
        reset_after,
    } = decision
    {
        set_header(headers, "x-ratelimit-limit", u64::from(*limit));
        set_header(headers, "x-ratelimit-remaining", u64::from(*remaining));
        set_header(headers, "x-ratelimit-reset", retry_after_secs(*reset_after));
    }
}

/// Whole seconds, rounded up, never below one.
fn retry_after_secs(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: u64) {
    headers.insert(name, HeaderValue::from(value));
}

/// Middleware: copy the underlying error text into failure envelopes when
/// the server runs in debug mode.
pub async fn expose_error_detail(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if !state.config.debug {
        return response;
    }

    match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(axum::http::header::CONTENT_LENGTH);
            let body = ErrorEnvelope::new(report.message, Some(report.detail));
            (parts, Json(body)).into_response()
        }
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::Webhook(WebhookError::RateLimited {
                    webhook_id: "wh".into(),
                    limit: 5,
                    retry_after: Duration::from_secs(30),
                }),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (AppError::Webhook(WebhookError::MissingSignature), StatusCode::FORBIDDEN),
            (AppError::Webhook(WebhookError::InvalidSignature), StatusCode::FORBIDDEN),
            (
                AppError::Webhook(WebhookError::SecretUnavailable("wh".into())),
                StatusCode::FORBIDDEN,
            ),
            (
                AppError::Webhook(WebhookError::WebhookNotFound("wh".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Webhook(WebhookError::WorkflowInactive("wf".into())),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Webhook(WebhookError::Repository(RepositoryError::Query("boom".into()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Trigger(TriggerError::NotFound(uuid::Uuid::nil())),
                StatusCode::NOT_FOUND,
            ),
            (AppError::BadRequest("bad".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Rejected {
                    status: StatusCode::PAYLOAD_TOO_LARGE,
                    message: "Failed to buffer the request body".into(),
                },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = AppError::Repository(RepositoryError::Query("no such table: /secret".into()));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("/secret"));
        assert!(err.detail().contains("/secret"));
    }

    #[test]
    fn test_rate_limited_headers() {
        let response = AppError::Webhook(WebhookError::RateLimited {
            webhook_id: "wh".into(),
            limit: 5,
            retry_after: Duration::from_millis(12_300),
        })
        .into_response();

        assert_eq!(response.headers()["retry-after"], "13");
        assert_eq!(response.headers()["x-ratelimit-limit"], "5");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }

    #[test]
    fn test_retry_after_never_zero() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(60)), 60);
    }
}
