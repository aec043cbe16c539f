//! HTTP API for the invoice pipeline.
//!
//! Three write entrypoints (extract, evaluate, approval decision) plus a
//! small read surface over invoices, the review queue, and the audit log.
//! Every response is structured JSON, including failures.

mod auth;
mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::repository::DbContext;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub ctx: DbContext,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: Arc::new(settings.clone()),
            ctx: settings.create_db_context(),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    state.ctx.init_schema().await?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::config::ApiKeyEntry;
    use crate::models::Invoice;

    async fn setup_test_app() -> (axum::Router, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().to_path_buf(),
            api_keys: vec![ApiKeyEntry {
                key: "test-key".to_string(),
                actor_id: "tester".to_string(),
                org_id: "org-1".to_string(),
            }],
            ..Default::default()
        };

        let state = AppState::new(&settings);
        state.ctx.init_schema().await.unwrap();

        let invoice = Invoice::new(
            "inv-1".to_string(),
            "org-1".to_string(),
            7000.0,
            "USD".to_string(),
        );
        state.ctx.invoices().create(&invoice).await.unwrap();

        (create_router(state), dir)
    }

    fn body_bytes(body: &str) -> Body {
        Body::from(body.to_string())
    }

    #[tokio::test]
    async fn test_missing_api_key_is_401() {
        let (app, _dir) = setup_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/invoices/inv-1/evaluate")
                    .header("content-type", "application/json")
                    .body(body_bytes(r#"{"invoice_data": {"amount": 7000.0}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_api_key_is_401() {
        let (app, _dir) = setup_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/invoices/inv-1")
                    .header("authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_evaluate_unknown_invoice_is_404() {
        let (app, _dir) = setup_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/invoices/no-such/evaluate")
                    .header("authorization", "Bearer test-key")
                    .header("content-type", "application/json")
                    .body(body_bytes(r#"{"invoice_data": {"amount": 100.0}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_evaluate_with_no_policies_auto_approves() {
        let (app, _dir) = setup_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/invoices/inv-1/evaluate")
                    .header("authorization", "Bearer test-key")
                    .header("content-type", "application/json")
                    .body(body_bytes(r#"{"invoice_data": {"amount": 7000.0}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["final_decision"], "auto_approve");
        assert_eq!(json["required_approvals"], 0);
    }

    #[tokio::test]
    async fn test_approval_decision_requires_valid_value() {
        let (app, _dir) = setup_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/approvals/appr-1/decision")
                    .header("authorization", "Bearer test-key")
                    .header("content-type", "application/json")
                    .body(body_bytes(r#"{"decision": "maybe"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
