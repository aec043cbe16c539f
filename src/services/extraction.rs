//! Extraction service: raw document bytes to a validated, confidence-scored
//! invoice extraction.
//!
//! One backend call per attempt, no retry. The budget reconciliation and
//! status derivation are pure functions so the branching logic tests
//! without a live backend or database.

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm::{ExtractionClient, LlmError};
use crate::models::{
    Actor, Afe, BudgetStatus, ExtractedFields, ExtractionStatus, Invoice, InvoiceExtraction,
    InvoiceStatus,
};
use crate::repository::extraction::InvoiceFinalize;
use crate::repository::{AfeRepository, DieselError, ExtractionRepository, InvoiceRepository};

/// Fraction of headroom below which a utilization warning fires.
const UTILIZATION_WARNING_HEADROOM: f64 = 0.10;

/// Errors surfaced by the extraction entrypoint.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invoice {0} not found")]
    InvoiceNotFound(String),
    #[error("extraction backend failure: {0}")]
    Backend(#[from] LlmError),
    #[error(transparent)]
    Db(#[from] DieselError),
}

/// Document modality, driving which backend call shape is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Plain text: schema-constrained structured-output call.
    Text,
    /// Binary/image/PDF: vision-capable call.
    Binary,
}

/// Classify a document by explicit hint first, then content sniffing.
pub fn classify_modality(content: &[u8], hint: Option<&str>) -> DocumentKind {
    if let Some(hint) = hint {
        let hint = hint.to_ascii_lowercase();
        if hint.contains("pdf") || hint.starts_with("image/") {
            return DocumentKind::Binary;
        }
        if hint.starts_with("text/") || hint == "application/json" {
            return DocumentKind::Text;
        }
    }

    if let Some(kind) = infer::get(content) {
        let mime = kind.mime_type();
        if mime == "application/pdf" || mime.starts_with("image/") {
            return DocumentKind::Binary;
        }
    }

    if std::str::from_utf8(content).is_ok() {
        DocumentKind::Text
    } else {
        DocumentKind::Binary
    }
}

/// Parse the backend response into structured fields.
///
/// Tries the whole payload first, then the outermost JSON object embedded
/// in surrounding prose. `None` means the caller should degrade to a
/// partial result rather than fail the request.
pub fn parse_backend_response(raw: &str) -> Option<ExtractedFields> {
    if let Ok(fields) = serde_json::from_str::<ExtractedFields>(raw) {
        return Some(fields);
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

/// Outcome of reconciling one invoice against the AFE ledger.
#[derive(Debug, Clone)]
pub struct BudgetCheck {
    pub status: BudgetStatus,
    pub remaining: Option<f64>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl BudgetCheck {
    fn new(status: BudgetStatus) -> Self {
        Self {
            status,
            remaining: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Project the invoice spend against the AFE and derive status, errors,
/// and warnings. Pure; the lookup happens at the call site.
pub fn reconcile_budget(
    afe_number: Option<&str>,
    afe: Option<&Afe>,
    invoice_amount: f64,
) -> BudgetCheck {
    let Some(number) = afe_number else {
        return BudgetCheck::new(BudgetStatus::NoAfe);
    };

    let Some(afe) = afe else {
        // The AFE may simply not be registered yet; surface, don't block.
        let mut check = BudgetCheck::new(BudgetStatus::AfeNotFound);
        check.warnings.push(format!(
            "AFE {} not found in the active ledger; budget not verified",
            number
        ));
        return check;
    };

    let projected = afe.spent_amount + invoice_amount;
    let remaining = afe.budget_amount - projected;

    let mut check = if remaining >= 0.0 {
        BudgetCheck::new(BudgetStatus::WithinBudget)
    } else {
        let mut check = BudgetCheck::new(BudgetStatus::OverBudget);
        check.errors.push(format!(
            "Invoice exceeds AFE {} budget by ${:.2} (budget ${:.2}, projected spend ${:.2})",
            afe.afe_number,
            -remaining,
            afe.budget_amount,
            projected
        ));
        check
    };
    check.remaining = Some(remaining);

    if afe.budget_amount > 0.0 && remaining < UTILIZATION_WARNING_HEADROOM * afe.budget_amount {
        let utilization = projected / afe.budget_amount * 100.0;
        check.warnings.push(format!(
            "AFE {} at {:.1}% utilization after this invoice",
            afe.afe_number, utilization
        ));
    }

    check
}

/// Derive the invoice status from accumulated signals. First match wins:
/// errors, then warnings, then a clean within-budget result.
pub fn derive_invoice_status(
    errors: &[String],
    warnings: &[String],
    budget_status: BudgetStatus,
) -> InvoiceStatus {
    if !errors.is_empty() {
        InvoiceStatus::ValidationFailed
    } else if !warnings.is_empty() {
        InvoiceStatus::NeedsReview
    } else if budget_status == BudgetStatus::WithinBudget {
        InvoiceStatus::Validated
    } else {
        InvoiceStatus::Pending
    }
}

/// Result of a completed extraction request.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub extraction_id: String,
    pub invoice_status: InvoiceStatus,
    pub fields: ExtractedFields,
    pub budget_status: BudgetStatus,
    pub budget_remaining: Option<f64>,
    pub validation_errors: Vec<String>,
    pub validation_warnings: Vec<String>,
}

/// The extraction stage of the pipeline.
pub struct ExtractionService {
    client: ExtractionClient,
    invoices: InvoiceRepository,
    extractions: ExtractionRepository,
    ledger: AfeRepository,
}

impl ExtractionService {
    pub fn new(
        client: ExtractionClient,
        invoices: InvoiceRepository,
        extractions: ExtractionRepository,
        ledger: AfeRepository,
    ) -> Self {
        Self {
            client,
            invoices,
            extractions,
            ledger,
        }
    }

    /// Run one extraction attempt against an invoice document.
    pub async fn extract(
        &self,
        actor: &Actor,
        invoice_id: &str,
        content: &[u8],
        content_type: Option<&str>,
    ) -> Result<ExtractionOutcome, ExtractError> {
        let invoice = self
            .invoices
            .get_scoped(invoice_id, &actor.org_id)
            .await?
            .ok_or_else(|| ExtractError::InvoiceNotFound(invoice_id.to_string()))?;

        let mut extraction =
            InvoiceExtraction::new(Uuid::new_v4().to_string(), invoice.id.clone());

        let kind = classify_modality(content, content_type);
        debug!("Extracting invoice {} as {:?} document", invoice.id, kind);

        let raw = match kind {
            DocumentKind::Text => {
                let text = String::from_utf8_lossy(content);
                self.client.extract_text(&text).await
            }
            DocumentKind::Binary => self.client.extract_document(content).await,
        };

        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                // No retry: mark the attempt failed and surface the error.
                warn!("Extraction backend failed for invoice {}: {}", invoice.id, e);
                self.extractions
                    .persist_failed(&extraction, &e.to_string(), Some(&actor.id))
                    .await?;
                return Err(ExtractError::Backend(e));
            }
        };

        let fields = match parse_backend_response(&raw) {
            Some(fields) => fields,
            None => {
                // Partial result beats none: keep the raw text, no scores.
                warn!(
                    "Unparseable backend response for invoice {}; storing raw text",
                    invoice.id
                );
                ExtractedFields::default()
            }
        };
        extraction.raw_response = Some(raw.clone());

        let effective_amount = fields.amount.unwrap_or(invoice.amount);

        // Budget reconciliation against the active AFE for this org.
        let afe = match fields.afe_number.as_deref() {
            Some(number) => {
                self.ledger
                    .find_active_by_number(&actor.org_id, number)
                    .await?
            }
            None => None,
        };
        let budget = reconcile_budget(fields.afe_number.as_deref(), afe.as_ref(), effective_amount);

        let mut errors = budget.errors.clone();
        let mut warnings = budget.warnings.clone();
        extraction.afe_id = afe.as_ref().map(|a| a.id.clone());
        extraction.budget_status = budget.status;
        extraction.budget_remaining = budget.remaining;

        // Well identifier cross-reference: mismatches surface for human
        // attention, never block.
        if let Some(uwi) = fields.well_identifier.as_deref() {
            match self.ledger.find_well_by_uwi(&actor.org_id, uwi).await? {
                Some(well) => extraction.well_id = Some(well.id),
                None => warnings.push(format!(
                    "Well identifier {} not found in the well registry",
                    uwi
                )),
            }
        }

        // Duplicate detection over normalized identifying fields.
        let duplicate_hash = match (fields.vendor_name.as_deref(), fields.invoice_number.as_deref())
        {
            (Some(vendor), Some(number)) => Some(Invoice::compute_duplicate_hash(
                &actor.org_id,
                vendor,
                number,
                effective_amount,
            )),
            _ => None,
        };
        if let Some(hash) = duplicate_hash.as_deref() {
            if let Some(other) = self
                .invoices
                .find_duplicate(&actor.org_id, hash, &invoice.id)
                .await?
            {
                warnings.push(format!("Possible duplicate of invoice {}", other));
            }
        }

        let status = derive_invoice_status(&errors, &warnings, budget.status);

        extraction.fields = fields.clone();
        extraction.extraction_status = ExtractionStatus::Completed;
        extraction.validation_errors = errors.clone();
        extraction.validation_warnings = warnings.clone();

        let finalize = InvoiceFinalize {
            status,
            vendor_name: fields.vendor_name.clone().or(invoice.vendor_name),
            invoice_number: fields.invoice_number.clone().or(invoice.invoice_number),
            amount: effective_amount,
            currency: fields.currency.clone().unwrap_or(invoice.currency),
            confidence_score: fields.overall_confidence(),
            extracted_payload: Some(raw),
            duplicate_hash,
        };

        self.extractions
            .persist_completed(&extraction, &finalize, Some(&actor.id))
            .await?;

        info!(
            "Extraction {} for invoice {}: {} ({} errors, {} warnings)",
            extraction.id,
            invoice.id,
            extraction.budget_status.as_str(),
            errors.len(),
            warnings.len()
        );

        Ok(ExtractionOutcome {
            extraction_id: extraction.id,
            invoice_status: status,
            fields,
            budget_status: budget.status,
            budget_remaining: budget.remaining,
            validation_errors: errors,
            validation_warnings: warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn afe(budget: f64, spent: f64) -> Afe {
        let mut afe = Afe::new(
            "afe-1".to_string(),
            "org-1".to_string(),
            "AFE-2024-001".to_string(),
            budget,
        );
        afe.spent_amount = spent;
        afe
    }

    #[test]
    fn test_within_budget_with_utilization_warning() {
        // budget 100k, spent 95k, invoice 3k: remaining 2k, >=90% utilized
        let check = reconcile_budget(Some("AFE-2024-001"), Some(&afe(100_000.0, 95_000.0)), 3_000.0);
        assert_eq!(check.status, BudgetStatus::WithinBudget);
        assert!((check.remaining.unwrap() - 2_000.0).abs() < 1e-9);
        assert!(check.errors.is_empty());
        assert_eq!(check.warnings.len(), 1);
        assert!(check.warnings[0].contains("98.0%"));
    }

    #[test]
    fn test_over_budget_is_an_error() {
        // budget 100k, spent 95k, invoice 10k: remaining -5k
        let check =
            reconcile_budget(Some("AFE-2024-001"), Some(&afe(100_000.0, 95_000.0)), 10_000.0);
        assert_eq!(check.status, BudgetStatus::OverBudget);
        assert!((check.remaining.unwrap() + 5_000.0).abs() < 1e-9);
        assert_eq!(check.errors.len(), 1);
        assert!(check.errors[0].contains("$5000.00"));
        // Utilization warning fires regardless of over/under
        assert_eq!(check.warnings.len(), 1);
    }

    #[test]
    fn test_budget_remaining_identity() {
        let afe = afe(80_000.0, 30_000.0);
        let check = reconcile_budget(Some(afe.afe_number.as_str()), Some(&afe), 12_500.0);
        let expected = afe.budget_amount - (afe.spent_amount + 12_500.0);
        assert!((check.remaining.unwrap() - expected).abs() < 1e-9);
        assert_eq!(
            check.status == BudgetStatus::OverBudget,
            check.remaining.unwrap() < 0.0
        );
    }

    #[test]
    fn test_afe_not_found_is_a_warning() {
        let check = reconcile_budget(Some("AFE-MISSING"), None, 5_000.0);
        assert_eq!(check.status, BudgetStatus::AfeNotFound);
        assert!(check.errors.is_empty());
        assert_eq!(check.warnings.len(), 1);
        assert!(check.remaining.is_none());
    }

    #[test]
    fn test_no_afe_number_is_silent() {
        let check = reconcile_budget(None, None, 5_000.0);
        assert_eq!(check.status, BudgetStatus::NoAfe);
        assert!(check.errors.is_empty());
        assert!(check.warnings.is_empty());
    }

    #[test]
    fn test_status_precedence() {
        let err = vec!["over budget".to_string()];
        let warn = vec!["high utilization".to_string()];
        let none: Vec<String> = Vec::new();

        // Errors win over everything
        assert_eq!(
            derive_invoice_status(&err, &warn, BudgetStatus::OverBudget),
            InvoiceStatus::ValidationFailed
        );
        // Warnings next
        assert_eq!(
            derive_invoice_status(&none, &warn, BudgetStatus::WithinBudget),
            InvoiceStatus::NeedsReview
        );
        // Clean within-budget validates
        assert_eq!(
            derive_invoice_status(&none, &none, BudgetStatus::WithinBudget),
            InvoiceStatus::Validated
        );
        // Anything else stays pending
        assert_eq!(
            derive_invoice_status(&none, &none, BudgetStatus::NoAfe),
            InvoiceStatus::Pending
        );
        assert_eq!(
            derive_invoice_status(&none, &none, BudgetStatus::AfeNotFound),
            InvoiceStatus::Pending
        );
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        // Same content and ledger state reproduce the same outcome.
        let ledger = afe(100_000.0, 95_000.0);
        let a = reconcile_budget(Some("AFE-2024-001"), Some(&ledger), 3_000.0);
        let b = reconcile_budget(Some("AFE-2024-001"), Some(&ledger), 3_000.0);
        assert_eq!(a.status, b.status);
        assert_eq!(a.errors, b.errors);
        assert_eq!(a.warnings, b.warnings);
    }

    #[test]
    fn test_classify_modality() {
        // Explicit hint wins
        assert_eq!(
            classify_modality(b"plain text", Some("application/pdf")),
            DocumentKind::Binary
        );
        assert_eq!(
            classify_modality(b"plain text", Some("text/plain")),
            DocumentKind::Text
        );
        // PDF magic bytes
        assert_eq!(
            classify_modality(b"%PDF-1.7 rest of file", None),
            DocumentKind::Binary
        );
        // PNG magic bytes
        assert_eq!(
            classify_modality(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], None),
            DocumentKind::Binary
        );
        // Valid UTF-8 falls back to text
        assert_eq!(classify_modality(b"INVOICE #123", None), DocumentKind::Text);
        // Arbitrary binary garbage
        assert_eq!(
            classify_modality(&[0xFF, 0xFE, 0x00, 0x01, 0x02], None),
            DocumentKind::Binary
        );
    }

    #[test]
    fn test_parse_backend_response() {
        // Clean JSON
        let fields = parse_backend_response(r#"{"amount": 100.0}"#).unwrap();
        assert_eq!(fields.amount, Some(100.0));

        // JSON wrapped in prose
        let fields =
            parse_backend_response("Here is the data:\n{\"amount\": 250.5}\nDone.").unwrap();
        assert_eq!(fields.amount, Some(250.5));

        // Not JSON at all degrades to None
        assert!(parse_backend_response("I could not read this document").is_none());
    }
}
