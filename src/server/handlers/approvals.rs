//! Approval-action entrypoint.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error_response;
use crate::models::{Approval, ApprovalDecision};
use crate::server::auth::authenticate;
use crate::server::AppState;
use crate::services::{ApprovalWorkflow, WorkflowError};

/// Request body: a human decision on one approval level.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// `approved` or `rejected`.
    pub decision: String,
    pub comments: Option<String>,
}

/// Response body for an applied decision.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub success: bool,
    pub approval: Approval,
    pub invoice_status: String,
    pub finalized: bool,
    pub ledger_remaining: Option<f64>,
}

/// Apply a human decision to a pending approval.
pub async fn decide_approval(
    State(state): State<AppState>,
    Path(approval_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<DecisionRequest>,
) -> Response {
    let actor = match authenticate(&headers, &state.settings) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let Some(decision) = ApprovalDecision::from_str(&request.decision) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "invalid decision '{}'; expected 'approved' or 'rejected'",
                request.decision
            ),
        );
    };

    let workflow = ApprovalWorkflow::new(state.ctx.approvals());

    match workflow
        .decide(&actor, &approval_id, decision, request.comments.as_deref())
        .await
    {
        Ok(outcome) => Json(DecisionResponse {
            success: true,
            invoice_status: outcome.invoice_status.as_str().to_string(),
            approval: outcome.approval,
            finalized: outcome.finalized,
            ledger_remaining: outcome.ledger_remaining,
        })
        .into_response(),
        Err(e @ WorkflowError::CommentsRequired) => {
            error_response(StatusCode::BAD_REQUEST, e)
        }
        Err(e @ WorkflowError::NotFound) => error_response(StatusCode::NOT_FOUND, e),
        Err(e @ WorkflowError::AlreadyDecided(_)) => error_response(StatusCode::CONFLICT, e),
        Err(e @ WorkflowError::OutOfOrder(_)) => error_response(StatusCode::CONFLICT, e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}
