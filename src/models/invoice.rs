//! Invoice model and processing status.
//!
//! Invoices are created on upload and then mutated by the extraction
//! service, the policy engine, and the approval workflow. They are never
//! deleted; corrections are appended as new records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Processing status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Processing,
    Validated,
    NeedsReview,
    ValidationFailed,
    PendingApproval,
    Approved,
    Rejected,
    Duplicate,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Validated => "validated",
            Self::NeedsReview => "needs_review",
            Self::ValidationFailed => "validation_failed",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Duplicate => "duplicate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "validated" => Some(Self::Validated),
            "needs_review" => Some(Self::NeedsReview),
            "validation_failed" => Some(Self::ValidationFailed),
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "duplicate" => Some(Self::Duplicate),
            _ => None,
        }
    }

    /// Terminal statuses cannot be advanced by the approval workflow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Duplicate)
    }
}

/// A vendor invoice under processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier for this invoice.
    pub id: String,
    /// Owning organization.
    pub org_id: String,
    /// Reference to the billed vendor, once known.
    pub vendor_id: Option<String>,
    /// Vendor name as extracted from the document.
    pub vendor_name: Option<String>,
    /// Vendor-assigned invoice number.
    pub invoice_number: Option<String>,
    /// Invoice total.
    pub amount: f64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Invoice issue date.
    pub invoice_date: Option<DateTime<Utc>>,
    /// Payment due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Current processing status.
    pub status: InvoiceStatus,
    /// Overall extraction confidence (0.0 - 1.0).
    pub confidence_score: Option<f64>,
    /// Raw extraction payload from the AI backend.
    pub extracted_payload: Option<String>,
    /// Hash over normalized identifying fields, for duplicate detection.
    pub duplicate_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Create a new invoice in `pending` status.
    pub fn new(id: String, org_id: String, amount: f64, currency: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            org_id,
            vendor_id: None,
            vendor_name: None,
            invoice_number: None,
            amount,
            currency,
            invoice_date: None,
            due_date: None,
            status: InvoiceStatus::Pending,
            confidence_score: None,
            extracted_payload: None,
            duplicate_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Compute the duplicate-detection hash over normalized identifying
    /// fields. Two invoices from the same org, vendor, number, and amount
    /// hash identically.
    pub fn compute_duplicate_hash(
        org_id: &str,
        vendor_name: &str,
        invoice_number: &str,
        amount: f64,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(org_id.as_bytes());
        hasher.update(b"|");
        hasher.update(vendor_name.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(invoice_number.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(format!("{:.2}", amount).as_bytes());
        hex::encode(hasher.finalize())
    }
}
