//! Request handlers for the API.

mod approvals;
mod extraction;
mod policies;
mod reads;

pub use approvals::decide_approval;
pub use extraction::extract_invoice;
pub use policies::evaluate_invoice;
pub use reads::{audit_for_entity, get_invoice, list_review_queue};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Uniform JSON error response.
pub(crate) fn error_response(status: StatusCode, detail: impl std::fmt::Display) -> Response {
    (
        status,
        Json(serde_json::json!({ "success": false, "error": detail.to_string() })),
    )
        .into_response()
}
