//! Policy-evaluation entrypoint.
//!
//! The response keeps one shape on every path, including internal
//! failures (`success=false`, `final_decision="block"`), so callers can
//! treat it uniformly.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error_response;
use crate::models::PolicyType;
use crate::server::auth::authenticate;
use crate::server::AppState;
use crate::services::{InvoiceFacts, PolicyEngine, PolicyEvaluation};

/// Invoice context supplied by the caller.
#[derive(Debug, Deserialize)]
pub struct InvoiceDataBody {
    pub amount: f64,
    pub vendor_id: Option<String>,
    pub confidence_score: Option<f64>,
}

/// Request body for policy evaluation.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub invoice_data: InvoiceDataBody,
    /// Policy types to evaluate; defaults to all.
    pub policy_types: Option<Vec<String>>,
}

/// Response body, identical in shape on success and failure.
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub success: bool,
    pub invoice_id: String,
    pub policies_evaluated: Vec<PolicyEvaluation>,
    pub final_decision: String,
    pub required_approvals: u32,
    pub routing_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Evaluate routing policies against an invoice.
pub async fn evaluate_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<EvaluateRequest>,
) -> Response {
    let actor = match authenticate(&headers, &state.settings) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let policy_types = match request.policy_types {
        Some(names) => {
            let mut types = Vec::with_capacity(names.len());
            for name in &names {
                match PolicyType::from_str(name) {
                    Some(t) => types.push(t),
                    None => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            format!("unknown policy type: {}", name),
                        )
                    }
                }
            }
            Some(types)
        }
        None => None,
    };

    // The decision mutates the invoice; refuse to evaluate one that is not
    // visible to this caller.
    match state
        .ctx
        .invoices()
        .get_scoped(&invoice_id, &actor.org_id)
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                format!("invoice {} not found", invoice_id),
            )
        }
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }

    let facts = InvoiceFacts {
        amount: request.invoice_data.amount,
        vendor_id: request.invoice_data.vendor_id,
        confidence_score: request.invoice_data.confidence_score,
    };

    let engine = PolicyEngine::new(
        state.ctx.policies(),
        state.ctx.vendors(),
        state.ctx.routing(),
    );

    match engine
        .evaluate(&actor, &invoice_id, &facts, policy_types.as_deref())
        .await
    {
        Ok(report) => Json(EvaluateResponse {
            success: true,
            invoice_id: report.invoice_id,
            policies_evaluated: report.evaluations,
            final_decision: report.decision.as_str().to_string(),
            required_approvals: report.required_approvals,
            routing_reason: report.routing_reason,
            error: None,
        })
        .into_response(),
        // Same shape with success=false and a forced block.
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(EvaluateResponse {
                success: false,
                invoice_id,
                policies_evaluated: Vec::new(),
                final_decision: "block".to_string(),
                required_approvals: 0,
                routing_reason: "Policy evaluation failed".to_string(),
                error: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}
