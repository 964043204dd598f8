//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/` except `/health`. Unmatched paths get the
//! JSON error envelope.
//! Middleware: CORS, request tracing, debug error detail.

use axum::Router;
use axum::http::Uri;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::error::{AppError, expose_error_detail};
use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/webhooks/{webhook_id}",
            post(handlers::webhook::receive_webhook),
        )
        .route("/executions/{id}", get(handlers::execution::get_execution))
        .route(
            "/executions/{id}/cancel",
            post(handlers::execution::cancel_execution),
        )
        .route(
            "/workflows/{id}/executions",
            get(handlers::execution::list_executions),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            expose_error_detail,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

/// GET /health - Liveness check.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use hookgate_core::repository::WorkflowRepository;
    use hookgate_core::webhook::compute_signature;
    use hookgate_infra::sqlite::pool::DatabasePool;
    use hookgate_types::config::GatewayConfig;
    use hookgate_types::workflow::WorkflowDefinition;

    use super::*;

    const SECRET: &str = "lead-secret";

    async fn test_state(config: GatewayConfig) -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        let data_dir = dir.path().to_path_buf();
        // Keep the temp dir alive for the test's lifetime.
        std::mem::forget(dir);
        AppState::from_parts(config, data_dir, pool)
    }

    fn dev_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.webhooks.signature_required = false;
        config
    }

    fn lead_workflow(webhook_id: &str, secret: Option<&str>) -> WorkflowDefinition {
        let mut webhook = json!({ "id": webhook_id });
        if let Some(secret) = secret {
            webhook["secret"] = json!(secret);
        }
        serde_json::from_value(json!({
            "id": uuid::Uuid::now_v7(),
            "name": "lead-intake",
            "webhook": webhook,
            "canvas": {
                "nodes": [
                    { "id": "start", "type": "trigger" },
                    { "id": "check", "type": "condition",
                      "data": { "condition": "score", "operator": "greater_than", "value": "10" } },
                    { "id": "tag", "type": "action", "data": { "output": { "tagged": true } } }
                ],
                "edges": [
                    { "source": "start", "target": "check" },
                    { "source": "check", "target": "tag" }
                ]
            },
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    fn webhook_request(webhook_id: &str, body: &str, signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/webhooks/{webhook_id}"))
            .header("content-type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header("x-hub-signature-256", sig);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn wait_for_terminal(state: &AppState, execution_id: &str) -> Value {
        for _ in 0..200 {
            let response = build_router(state.clone())
                .oneshot(get(&format!("/api/v1/executions/{execution_id}")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = body_json(response).await;
            let status = body["data"]["status"].as_str().unwrap().to_string();
            if matches!(status.as_str(), "completed" | "failed" | "cancelled") {
                return body["data"].clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("execution {execution_id} never finished");
    }

    #[tokio::test]
    async fn test_health_check() {
        let state = test_state(GatewayConfig::default()).await;
        let response = build_router(state).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_signed_webhook_runs_workflow() {
        let state = test_state(GatewayConfig::default()).await;
        let def = lead_workflow("wh_lead", Some(SECRET));
        state.repo.save_workflow(&def).await.unwrap();

        let body = r#"{"email":"a@example.com","score":42}"#;
        let sig = compute_signature(SECRET.as_bytes(), body.as_bytes()).unwrap();
        let response = build_router(state.clone())
            .oneshot(webhook_request("wh_lead", body, Some(&sig)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "60");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "59");
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["workflow_id"], def.id.to_string());

        let execution_id = json["data"]["execution_id"].as_str().unwrap().to_string();
        let execution = wait_for_terminal(&state, &execution_id).await;
        assert_eq!(execution["status"], "completed");
        assert_eq!(execution["trigger_type"], "webhook");
        assert_eq!(execution["payload"]["score"], 42);
        assert_eq!(execution["outcome"]["context"]["condition_result"], true);
        assert_eq!(execution["outcome"]["context"]["tagged"], true);
    }

    #[tokio::test]
    async fn test_tampered_body_is_forbidden() {
        let state = test_state(GatewayConfig::default()).await;
        state
            .repo
            .save_workflow(&lead_workflow("wh_lead", Some(SECRET)))
            .await
            .unwrap();

        let sig = compute_signature(SECRET.as_bytes(), br#"{"score":1}"#).unwrap();
        let response = build_router(state)
            .oneshot(webhook_request("wh_lead", r#"{"score":2}"#, Some(&sig)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json.get("error").is_none(), "no detail outside debug mode");
    }

    #[tokio::test]
    async fn test_missing_secret_rejects_even_when_signed() {
        let state = test_state(GatewayConfig::default()).await;
        state
            .repo
            .save_workflow(&lead_workflow("wh_open", None))
            .await
            .unwrap();

        let body = r#"{"score":1}"#;
        let sig = compute_signature(b"anything", body.as_bytes()).unwrap();
        let response = build_router(state)
            .oneshot(webhook_request("wh_open", body, Some(&sig)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_debug_mode_exposes_error_detail() {
        let mut config = GatewayConfig::default();
        config.debug = true;
        let state = test_state(config).await;
        state
            .repo
            .save_workflow(&lead_workflow("wh_lead", Some(SECRET)))
            .await
            .unwrap();

        let response = build_router(state)
            .oneshot(webhook_request("wh_lead", "{}", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["error"], "missing webhook signature");
    }

    #[tokio::test]
    async fn test_unknown_webhook_is_not_found() {
        let state = test_state(dev_config()).await;
        let response = build_router(state)
            .oneshot(webhook_request("wh_nope", "{}", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_inactive_workflow_conflicts() {
        let state = test_state(dev_config()).await;
        let mut def = lead_workflow("wh_lead", None);
        def.is_active = false;
        state.repo.save_workflow(&def).await.unwrap();

        let response = build_router(state)
            .oneshot(webhook_request("wh_lead", "{}", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_invalid_workflow_is_unprocessable() {
        let state = test_state(dev_config()).await;
        let mut def = lead_workflow("wh_lead", None);
        def.canvas.nodes.retain(|n| n.id != "start");
        def.canvas.edges.clear();
        state.repo.save_workflow(&def).await.unwrap();

        let response = build_router(state)
            .oneshot(webhook_request("wh_lead", "{}", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert!(json["message"].as_str().unwrap().contains("no start nodes"));
    }

    #[tokio::test]
    async fn test_rate_limit_per_client_ip() {
        let mut config = dev_config();
        config.webhooks.rate_limit_per_minute = 2;
        config.server.trust_forwarded_for = true;
        let state = test_state(config).await;
        state
            .repo
            .save_workflow(&lead_workflow("wh_lead", None))
            .await
            .unwrap();

        let from = |ip: &str| {
            let mut req = webhook_request("wh_lead", "{}", None);
            req.headers_mut()
                .insert("x-forwarded-for", ip.parse().unwrap());
            req
        };

        for _ in 0..2 {
            let response = build_router(state.clone())
                .oneshot(from("198.51.100.1"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = build_router(state.clone())
            .oneshot(from("198.51.100.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()["retry-after"]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));

        let response = build_router(state)
            .oneshot(from("198.51.100.2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "other IPs keep their own counter");
    }

    #[tokio::test]
    async fn test_peer_address_keys_rate_limit_without_proxy_trust() {
        let mut config = dev_config();
        config.webhooks.rate_limit_per_minute = 1;
        let state = test_state(config).await;
        state
            .repo
            .save_workflow(&lead_workflow("wh_lead", None))
            .await
            .unwrap();

        let from_peer = |peer: &str, spoofed: &str| {
            let mut req = webhook_request("wh_lead", "{}", None);
            let addr: SocketAddr = peer.parse().unwrap();
            req.extensions_mut().insert(ConnectInfo(addr));
            req.headers_mut()
                .insert("x-forwarded-for", spoofed.parse().unwrap());
            req
        };

        let first = build_router(state.clone())
            .oneshot(from_peer("192.0.2.10:5000", "1.1.1.1"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = build_router(state)
            .oneshot(from_peer("192.0.2.10:5001", "2.2.2.2"))
            .await
            .unwrap();
        assert_eq!(
            second.status(),
            StatusCode::TOO_MANY_REQUESTS,
            "X-Forwarded-For is ignored unless trusted"
        );
    }

    #[tokio::test]
    async fn test_execution_history() {
        let state = test_state(dev_config()).await;
        let def = lead_workflow("wh_lead", None);
        state.repo.save_workflow(&def).await.unwrap();

        let response = build_router(state.clone())
            .oneshot(webhook_request("wh_lead", r#"{"score":3}"#, None))
            .await
            .unwrap();
        let execution_id = body_json(response).await["data"]["execution_id"]
            .as_str()
            .unwrap()
            .to_string();
        wait_for_terminal(&state, &execution_id).await;

        let response = build_router(state.clone())
            .oneshot(get(&format!("/api/v1/workflows/{}/executions?limit=5", def.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let list = json["data"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["id"], execution_id);

        let response = build_router(state.clone())
            .oneshot(get(&format!(
                "/api/v1/workflows/{}/executions",
                uuid::Uuid::now_v7()
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = build_router(state)
            .oneshot(get("/api/v1/executions/not-a-uuid"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cancel_unknown_execution() {
        let state = test_state(GatewayConfig::default()).await;
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/executions/{}/cancel", uuid::Uuid::now_v7()))
            .body(Body::empty())
            .unwrap();

        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_running_execution() {
        let state = test_state(dev_config()).await;
        let mut def = lead_workflow("wh_slow", None);
        def.canvas.nodes.push(
            serde_json::from_value(json!({ "id": "wait", "type": "delay", "data": { "delay": 30 } }))
                .unwrap(),
        );
        def.canvas.edges.push(
            serde_json::from_value(json!({ "source": "start", "target": "wait" })).unwrap(),
        );
        state.repo.save_workflow(&def).await.unwrap();

        let response = build_router(state.clone())
            .oneshot(webhook_request("wh_slow", "{}", None))
            .await
            .unwrap();
        let execution_id = body_json(response).await["data"]["execution_id"]
            .as_str()
            .unwrap()
            .to_string();

        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/executions/{execution_id}/cancel"))
            .body(Body::empty())
            .unwrap();
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let execution = wait_for_terminal(&state, &execution_id).await;
        assert_eq!(execution["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_rotated_secret_reaches_running_server() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("shared.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        let data_dir = dir.path().to_path_buf();
        std::mem::forget(dir);

        // Same database, separate in-memory caches: a server and a CLI invocation.
        let server = AppState::from_parts(GatewayConfig::default(), data_dir.clone(), pool.clone());
        let cli = AppState::from_parts(GatewayConfig::default(), data_dir, pool);

        let def = lead_workflow("wh_lead", Some("old-secret"));
        cli.repo.save_workflow(&def).await.unwrap();

        let body = r#"{"score":1}"#;
        let old_sig = compute_signature(b"old-secret", body.as_bytes()).unwrap();
        let new_sig = compute_signature(b"new-secret", body.as_bytes()).unwrap();
        let response = build_router(server.clone())
            .oneshot(webhook_request("wh_lead", body, Some(&old_sig)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut rotated = def.clone();
        rotated.webhook.as_mut().unwrap().secret = Some("new-secret".into());
        rotated.updated_at = def.updated_at + chrono::Duration::seconds(1);
        cli.repo.save_workflow(&rotated).await.unwrap();
        cli.ingress.secrets().forget("wh_lead").await.unwrap();

        let response = build_router(server.clone())
            .oneshot(webhook_request("wh_lead", body, Some(&new_sig)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = build_router(server)
            .oneshot(webhook_request("wh_lead", body, Some(&old_sig)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    async fn assert_envelope(response: Response, status: StatusCode) -> Value {
        assert_eq!(response.status(), status);
        assert_eq!(response.headers()["content-type"], "application/json");
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["message"].is_string());
        json
    }

    #[tokio::test]
    async fn test_malformed_query_gets_error_envelope() {
        let state = test_state(GatewayConfig::default()).await;
        let def = lead_workflow("wh_lead", None);
        state.repo.save_workflow(&def).await.unwrap();

        let response = build_router(state)
            .oneshot(get(&format!("/api/v1/workflows/{}/executions?limit=abc", def.id)))
            .await
            .unwrap();
        let json = assert_envelope(response, StatusCode::BAD_REQUEST).await;
        assert!(json["message"].as_str().unwrap().contains("limit"));
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_unknown_route_gets_error_envelope() {
        let state = test_state(GatewayConfig::default()).await;
        let response = build_router(state)
            .oneshot(get("/api/v1/nothing-here"))
            .await
            .unwrap();
        assert_envelope(response, StatusCode::NOT_FOUND).await;
    }

    #[tokio::test]
    async fn test_oversized_body_gets_error_envelope() {
        let state = test_state(dev_config()).await;
        state
            .repo
            .save_workflow(&lead_workflow("wh_lead", None))
            .await
            .unwrap();

        let body = format!(r#"{{"blob":"{}"}}"#, "x".repeat(3 * 1024 * 1024));
        let response = build_router(state)
            .oneshot(webhook_request("wh_lead", &body, None))
            .await
            .unwrap();
        assert_envelope(response, StatusCode::PAYLOAD_TOO_LARGE).await;
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_server_error_logged_with_webhook_id() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let state = test_state(dev_config()).await;
        state.db_pool.close().await;

        let response = build_router(state)
            .oneshot(webhook_request("wh_lead", "{}", None))
            .await
            .unwrap();
        assert_envelope(response, StatusCode::INTERNAL_SERVER_ERROR).await;

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let line = output
            .lines()
            .find(|l| l.contains("request failed"))
            .expect("5xx was not logged");
        assert!(line.contains("webhook_id=wh_lead"), "{line}");
    }
}
