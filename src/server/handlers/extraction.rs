//! Extraction entrypoint.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::error_response;
use crate::llm::ExtractionClient;
use crate::models::ExtractedFields;
use crate::server::auth::authenticate;
use crate::server::AppState;
use crate::services::{ExtractError, ExtractionService};

/// Request body: the document to extract.
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    /// Base64-encoded document bytes.
    pub file_content: String,
    /// Optional content-type hint (e.g. `application/pdf`, `text/plain`).
    pub file_type: Option<String>,
}

/// Response body for a completed extraction.
#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub extraction_id: String,
    pub extracted_data: ExtractedFields,
    pub invoice_status: String,
    pub budget_status: String,
    pub budget_remaining: Option<f64>,
    pub validation_errors: Vec<String>,
    pub validation_warnings: Vec<String>,
}

/// Run one extraction attempt against an invoice document.
pub async fn extract_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ExtractRequest>,
) -> Response {
    let actor = match authenticate(&headers, &state.settings) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    if request.file_content.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "file_content is required");
    }
    let content = match base64::engine::general_purpose::STANDARD.decode(&request.file_content) {
        Ok(content) => content,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("file_content is not valid base64: {}", e),
            )
        }
    };

    let service = ExtractionService::new(
        ExtractionClient::new(state.settings.extraction.clone()),
        state.ctx.invoices(),
        state.ctx.extractions(),
        state.ctx.afes(),
    );

    match service
        .extract(&actor, &invoice_id, &content, request.file_type.as_deref())
        .await
    {
        Ok(outcome) => Json(ExtractResponse {
            success: true,
            extraction_id: outcome.extraction_id,
            extracted_data: outcome.fields,
            invoice_status: outcome.invoice_status.as_str().to_string(),
            budget_status: outcome.budget_status.as_str().to_string(),
            budget_remaining: outcome.budget_remaining,
            validation_errors: outcome.validation_errors,
            validation_warnings: outcome.validation_warnings,
        })
        .into_response(),
        Err(ExtractError::InvoiceNotFound(id)) => error_response(
            StatusCode::NOT_FOUND,
            format!("invoice {} not found", id),
        ),
        // The attempt is recorded as failed; the caller owns any retry.
        Err(e @ ExtractError::Backend(_)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}
