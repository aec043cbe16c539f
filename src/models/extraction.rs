//! Invoice extraction records.
//!
//! One `InvoiceExtraction` is produced per extraction attempt against an
//! invoice document. A completed record carries the parsed fields, per-field
//! confidence scores, and the outcome of the budget reconciliation against
//! the AFE ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of an extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Processing,
    Completed,
    Failed,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Outcome of reconciling extracted spend against the AFE ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// No AFE number was extracted from the document.
    NoAfe,
    WithinBudget,
    OverBudget,
    /// An AFE number was extracted but no active AFE matches it.
    AfeNotFound,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAfe => "no_afe",
            Self::WithinBudget => "within_budget",
            Self::OverBudget => "over_budget",
            Self::AfeNotFound => "afe_not_found",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "no_afe" => Some(Self::NoAfe),
            "within_budget" => Some(Self::WithinBudget),
            "over_budget" => Some(Self::OverBudget),
            "afe_not_found" => Some(Self::AfeNotFound),
            _ => None,
        }
    }
}

/// A single line item parsed from an invoice document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
    /// Well identifier this line bills against, if stated.
    #[serde(default)]
    pub well_identifier: Option<String>,
}

/// Structured fields returned by the AI extraction backend.
///
/// This is the required output schema named in the extraction prompts; the
/// backend is not left to improvise its own shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    /// Authorization-for-Expenditure number the invoice bills against.
    #[serde(default)]
    pub afe_number: Option<String>,
    /// Unique well identifier (UWI) referenced by the invoice.
    #[serde(default)]
    pub well_identifier: Option<String>,
    #[serde(default)]
    pub field_ticket_numbers: Vec<String>,
    #[serde(default)]
    pub po_number: Option<String>,
    #[serde(default)]
    pub service_period_start: Option<String>,
    #[serde(default)]
    pub service_period_end: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Per-field confidence scores, 0.0 - 1.0.
    #[serde(default)]
    pub confidence_scores: BTreeMap<String, f64>,
}

impl ExtractedFields {
    /// Mean of the per-field confidence scores, if any were reported.
    pub fn overall_confidence(&self) -> Option<f64> {
        if self.confidence_scores.is_empty() {
            return None;
        }
        let sum: f64 = self.confidence_scores.values().sum();
        Some(sum / self.confidence_scores.len() as f64)
    }
}

/// The record of one extraction attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceExtraction {
    pub id: String,
    pub invoice_id: String,
    pub extraction_status: ExtractionStatus,
    pub fields: ExtractedFields,
    /// Resolved AFE row id, when the extracted number matched an active AFE.
    pub afe_id: Option<String>,
    /// Resolved well row id, when the extracted UWI matched the registry.
    pub well_id: Option<String>,
    /// Unparsed backend response, kept for partial results and debugging.
    pub raw_response: Option<String>,
    pub budget_status: BudgetStatus,
    /// Signed remaining budget after projecting this invoice's spend.
    pub budget_remaining: Option<f64>,
    pub validation_errors: Vec<String>,
    pub validation_warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceExtraction {
    /// Create a fresh extraction record for an attempt that is under way.
    pub fn new(id: String, invoice_id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            invoice_id,
            extraction_status: ExtractionStatus::Processing,
            fields: ExtractedFields::default(),
            afe_id: None,
            well_id: None,
            raw_response: None,
            budget_status: BudgetStatus::NoAfe,
            budget_remaining: None,
            validation_errors: Vec::new(),
            validation_warnings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
