//! Read endpoints: invoice detail, the review queue, and audit trails.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::error_response;
use crate::models::{Approval, Invoice, InvoiceExtraction};
use crate::server::auth::authenticate;
use crate::server::AppState;

/// Invoice detail with its latest extraction and approval chain.
#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub latest_extraction: Option<InvoiceExtraction>,
    pub approvals: Vec<Approval>,
}

/// Get an invoice with its latest extraction and approval chain.
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let actor = match authenticate(&headers, &state.settings) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let invoice = match state
        .ctx
        .invoices()
        .get_scoped(&invoice_id, &actor.org_id)
        .await
    {
        Ok(Some(invoice)) => invoice,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                format!("invoice {} not found", invoice_id),
            )
        }
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    };

    let latest_extraction = match state
        .ctx
        .extractions()
        .latest_completed_for_invoice(&invoice_id)
        .await
    {
        Ok(extraction) => extraction,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    };

    let approvals = match state.ctx.approvals().list_for_invoice(&invoice_id).await {
        Ok(approvals) => approvals,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    };

    Json(InvoiceDetail {
        invoice,
        latest_extraction,
        approvals,
    })
    .into_response()
}

/// List unresolved review queue entries (the HIL queue).
pub async fn list_review_queue(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = authenticate(&headers, &state.settings) {
        return response;
    }

    match state.ctx.reviews().list_open().await {
        Ok(entries) => {
            let count = entries.len();
            Json(serde_json::json!({ "entries": entries, "count": count })).into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// List the audit trail for one entity.
pub async fn audit_for_entity(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authenticate(&headers, &state.settings) {
        return response;
    }

    match state
        .ctx
        .audit()
        .list_for_entity(&entity_type, &entity_id)
        .await
    {
        Ok(entries) => Json(serde_json::json!({ "entries": entries })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}
