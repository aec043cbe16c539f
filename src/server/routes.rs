//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Pipeline entrypoints
        .route(
            "/api/invoices/:invoice_id/extract",
            post(handlers::extract_invoice),
        )
        .route(
            "/api/invoices/:invoice_id/evaluate",
            post(handlers::evaluate_invoice),
        )
        .route(
            "/api/approvals/:approval_id/decision",
            post(handlers::decide_approval),
        )
        // Read surface
        .route("/api/invoices/:invoice_id", get(handlers::get_invoice))
        .route("/api/review-queue", get(handlers::list_review_queue))
        .route(
            "/api/audit/:entity_type/:entity_id",
            get(handlers::audit_for_entity),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
