//! Invoice extraction repository.
//!
//! Persisting an extraction outcome mutates two tables and the audit log;
//! those writes run in one transaction so an invoice can never carry a
//! status its extraction record does not explain.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::audit;
use super::pool::{to_diesel_error, AsyncSqlitePool, DieselError};
use super::records::{ExtractionRecord, NewExtraction};
use super::{parse_datetime, parse_string_list};
use crate::models::{
    BudgetStatus, ExtractedFields, ExtractionStatus, InvoiceExtraction, InvoiceStatus,
};
use crate::schema::{invoice_extractions, invoices};

/// Final invoice column values applied alongside a completed extraction.
#[derive(Debug, Clone)]
pub struct InvoiceFinalize {
    pub status: InvoiceStatus,
    pub vendor_name: Option<String>,
    pub invoice_number: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub confidence_score: Option<f64>,
    pub extracted_payload: Option<String>,
    pub duplicate_hash: Option<String>,
}

/// Diesel-based extraction repository.
#[derive(Clone)]
pub struct ExtractionRepository {
    pool: AsyncSqlitePool,
}

impl ExtractionRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    fn record_to_extraction(record: ExtractionRecord) -> InvoiceExtraction {
        let fields = ExtractedFields {
            vendor_name: None,
            invoice_number: None,
            amount: None,
            currency: None,
            invoice_date: None,
            due_date: None,
            afe_number: record.afe_number.clone(),
            well_identifier: record.well_identifier.clone(),
            field_ticket_numbers: parse_string_list(&record.field_ticket_numbers),
            po_number: record.po_number.clone(),
            service_period_start: record.service_period_start.clone(),
            service_period_end: record.service_period_end.clone(),
            line_items: serde_json::from_str(&record.line_items).unwrap_or_default(),
            confidence_scores: serde_json::from_str(&record.confidence_scores)
                .unwrap_or_default(),
        };

        InvoiceExtraction {
            extraction_status: ExtractionStatus::from_str(&record.extraction_status)
                .unwrap_or(ExtractionStatus::Failed),
            budget_status: BudgetStatus::from_str(&record.budget_status)
                .unwrap_or(BudgetStatus::NoAfe),
            validation_errors: parse_string_list(&record.validation_errors),
            validation_warnings: parse_string_list(&record.validation_warnings),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
            fields,
            id: record.id,
            invoice_id: record.invoice_id,
            afe_id: record.afe_id,
            well_id: record.well_id,
            raw_response: record.raw_response,
            budget_remaining: record.budget_remaining,
        }
    }

    /// Persist a completed extraction, the invoice mutation it implies, and
    /// the audit entry, atomically.
    pub async fn persist_completed(
        &self,
        extraction: &InvoiceExtraction,
        finalize: &InvoiceFinalize,
        actor_id: Option<&str>,
    ) -> Result<(), DieselError> {
        let field_ticket_numbers =
            serde_json::to_string(&extraction.fields.field_ticket_numbers)
                .map_err(to_diesel_error)?;
        let line_items =
            serde_json::to_string(&extraction.fields.line_items).map_err(to_diesel_error)?;
        let confidence_scores = serde_json::to_string(&extraction.fields.confidence_scores)
            .map_err(to_diesel_error)?;
        let validation_errors =
            serde_json::to_string(&extraction.validation_errors).map_err(to_diesel_error)?;
        let validation_warnings =
            serde_json::to_string(&extraction.validation_warnings).map_err(to_diesel_error)?;
        let now = Utc::now().to_rfc3339();

        let audit_summary = serde_json::json!({
            "extraction_id": extraction.id,
            "budget_status": extraction.budget_status.as_str(),
            "error_count": extraction.validation_errors.len(),
            "warning_count": extraction.validation_warnings.len(),
            "invoice_status": finalize.status.as_str(),
        });

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, DieselError, _>(|conn| {
            async move {
                diesel::insert_into(invoice_extractions::table)
                    .values(&NewExtraction {
                        id: &extraction.id,
                        invoice_id: &extraction.invoice_id,
                        extraction_status: ExtractionStatus::Completed.as_str(),
                        afe_number: extraction.fields.afe_number.as_deref(),
                        afe_id: extraction.afe_id.as_deref(),
                        well_identifier: extraction.fields.well_identifier.as_deref(),
                        well_id: extraction.well_id.as_deref(),
                        field_ticket_numbers: &field_ticket_numbers,
                        po_number: extraction.fields.po_number.as_deref(),
                        service_period_start: extraction.fields.service_period_start.as_deref(),
                        service_period_end: extraction.fields.service_period_end.as_deref(),
                        line_items: &line_items,
                        confidence_scores: &confidence_scores,
                        raw_response: extraction.raw_response.as_deref(),
                        budget_status: extraction.budget_status.as_str(),
                        budget_remaining: extraction.budget_remaining,
                        validation_errors: &validation_errors,
                        validation_warnings: &validation_warnings,
                        created_at: &now,
                        updated_at: &now,
                    })
                    .execute(conn)
                    .await?;

                diesel::update(invoices::table.find(&extraction.invoice_id))
                    .set((
                        invoices::status.eq(finalize.status.as_str()),
                        invoices::vendor_name.eq(finalize.vendor_name.as_deref()),
                        invoices::invoice_number.eq(finalize.invoice_number.as_deref()),
                        invoices::amount.eq(finalize.amount),
                        invoices::currency.eq(&finalize.currency),
                        invoices::confidence_score.eq(finalize.confidence_score),
                        invoices::extracted_payload.eq(finalize.extracted_payload.as_deref()),
                        invoices::duplicate_hash.eq(finalize.duplicate_hash.as_deref()),
                        invoices::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .await?;

                audit::insert_entry(
                    conn,
                    "invoice.extraction_completed",
                    "invoice",
                    &extraction.invoice_id,
                    actor_id,
                    None,
                    Some(&audit_summary),
                )
                .await
            }
            .scope_boxed()
        })
        .await
    }

    /// Persist a failed extraction attempt and its audit entry. The invoice
    /// itself is left untouched.
    pub async fn persist_failed(
        &self,
        extraction: &InvoiceExtraction,
        error: &str,
        actor_id: Option<&str>,
    ) -> Result<(), DieselError> {
        let validation_errors =
            serde_json::to_string(&vec![error.to_string()]).map_err(to_diesel_error)?;
        let now = Utc::now().to_rfc3339();

        let audit_summary = serde_json::json!({
            "extraction_id": extraction.id,
            "error": error,
        });

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, DieselError, _>(|conn| {
            async move {
                diesel::insert_into(invoice_extractions::table)
                    .values(&NewExtraction {
                        id: &extraction.id,
                        invoice_id: &extraction.invoice_id,
                        extraction_status: ExtractionStatus::Failed.as_str(),
                        afe_number: None,
                        afe_id: None,
                        well_identifier: None,
                        well_id: None,
                        field_ticket_numbers: "[]",
                        po_number: None,
                        service_period_start: None,
                        service_period_end: None,
                        line_items: "[]",
                        confidence_scores: "{}",
                        raw_response: extraction.raw_response.as_deref(),
                        budget_status: BudgetStatus::NoAfe.as_str(),
                        budget_remaining: None,
                        validation_errors: &validation_errors,
                        validation_warnings: "[]",
                        created_at: &now,
                        updated_at: &now,
                    })
                    .execute(conn)
                    .await?;

                audit::insert_entry(
                    conn,
                    "invoice.extraction_failed",
                    "invoice",
                    &extraction.invoice_id,
                    actor_id,
                    None,
                    Some(&audit_summary),
                )
                .await
            }
            .scope_boxed()
        })
        .await
    }

    /// Get an extraction by id.
    pub async fn get(&self, id: &str) -> Result<Option<InvoiceExtraction>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<ExtractionRecord> = invoice_extractions::table
            .find(id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Self::record_to_extraction))
    }

    /// Latest completed extraction for an invoice, if any.
    pub async fn latest_completed_for_invoice(
        &self,
        invoice_id: &str,
    ) -> Result<Option<InvoiceExtraction>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<ExtractionRecord> = invoice_extractions::table
            .filter(invoice_extractions::invoice_id.eq(invoice_id))
            .filter(invoice_extractions::extraction_status.eq(ExtractionStatus::Completed.as_str()))
            .order(invoice_extractions::created_at.desc())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Self::record_to_extraction))
    }
}
