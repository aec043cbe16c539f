//! Diesel ORM models for database tables.
//!
//! These models provide compile-time type checking for database operations.
//! JSON list/map columns are stored as TEXT and decoded in the repository
//! conversion helpers.

use diesel::prelude::*;

use crate::schema;

/// Invoice record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::invoices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InvoiceRecord {
    pub id: String,
    pub org_id: String,
    pub vendor_id: Option<String>,
    pub vendor_name: Option<String>,
    pub invoice_number: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub status: String,
    pub confidence_score: Option<f64>,
    pub extracted_payload: Option<String>,
    pub duplicate_hash: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// New invoice for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::invoices)]
pub struct NewInvoice<'a> {
    pub id: &'a str,
    pub org_id: &'a str,
    pub vendor_id: Option<&'a str>,
    pub vendor_name: Option<&'a str>,
    pub invoice_number: Option<&'a str>,
    pub amount: f64,
    pub currency: &'a str,
    pub invoice_date: Option<&'a str>,
    pub due_date: Option<&'a str>,
    pub status: &'a str,
    pub confidence_score: Option<f64>,
    pub extracted_payload: Option<&'a str>,
    pub duplicate_hash: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Extraction attempt record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::invoice_extractions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExtractionRecord {
    pub id: String,
    pub invoice_id: String,
    pub extraction_status: String,
    pub afe_number: Option<String>,
    pub afe_id: Option<String>,
    pub well_identifier: Option<String>,
    pub well_id: Option<String>,
    pub field_ticket_numbers: String,
    pub po_number: Option<String>,
    pub service_period_start: Option<String>,
    pub service_period_end: Option<String>,
    pub line_items: String,
    pub confidence_scores: String,
    pub raw_response: Option<String>,
    pub budget_status: String,
    pub budget_remaining: Option<f64>,
    pub validation_errors: String,
    pub validation_warnings: String,
    pub created_at: String,
    pub updated_at: String,
}

/// New extraction attempt for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::invoice_extractions)]
pub struct NewExtraction<'a> {
    pub id: &'a str,
    pub invoice_id: &'a str,
    pub extraction_status: &'a str,
    pub afe_number: Option<&'a str>,
    pub afe_id: Option<&'a str>,
    pub well_identifier: Option<&'a str>,
    pub well_id: Option<&'a str>,
    pub field_ticket_numbers: &'a str,
    pub po_number: Option<&'a str>,
    pub service_period_start: Option<&'a str>,
    pub service_period_end: Option<&'a str>,
    pub line_items: &'a str,
    pub confidence_scores: &'a str,
    pub raw_response: Option<&'a str>,
    pub budget_status: &'a str,
    pub budget_remaining: Option<f64>,
    pub validation_errors: &'a str,
    pub validation_warnings: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// AFE record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::afes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AfeRecord {
    pub id: String,
    pub org_id: String,
    pub afe_number: String,
    pub description: Option<String>,
    pub budget_amount: f64,
    pub spent_amount: f64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// New AFE for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::afes)]
pub struct NewAfe<'a> {
    pub id: &'a str,
    pub org_id: &'a str,
    pub afe_number: &'a str,
    pub description: Option<&'a str>,
    pub budget_amount: f64,
    pub spent_amount: f64,
    pub status: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Well record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::wells)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WellRecord {
    pub id: String,
    pub org_id: String,
    pub uwi: String,
    pub name: String,
    pub created_at: String,
}

/// New well for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::wells)]
pub struct NewWell<'a> {
    pub id: &'a str,
    pub org_id: &'a str,
    pub uwi: &'a str,
    pub name: &'a str,
    pub created_at: &'a str,
}

/// Vendor record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::vendors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct VendorRecord {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub bank_account: Option<String>,
    pub created_at: String,
}

/// New vendor for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::vendors)]
pub struct NewVendor<'a> {
    pub id: &'a str,
    pub org_id: &'a str,
    pub name: &'a str,
    pub bank_account: Option<&'a str>,
    pub created_at: &'a str,
}

/// Policy record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::policies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PolicyRecord {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub policy_type: String,
    pub conditions: String,
    pub actions: String,
    pub priority: i32,
    pub is_active: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// New policy for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::policies)]
pub struct NewPolicy<'a> {
    pub id: &'a str,
    pub org_id: &'a str,
    pub name: &'a str,
    pub policy_type: &'a str,
    pub conditions: &'a str,
    pub actions: &'a str,
    pub priority: i32,
    pub is_active: i32,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Approval record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::approvals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ApprovalRecord {
    pub id: String,
    pub invoice_id: String,
    pub approval_level: i32,
    pub status: String,
    pub approver_id: Option<String>,
    pub amount_approved: Option<f64>,
    pub approval_date: Option<String>,
    pub comments: Option<String>,
    pub auto_approved: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// New approval for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::approvals)]
pub struct NewApproval<'a> {
    pub id: &'a str,
    pub invoice_id: &'a str,
    pub approval_level: i32,
    pub status: &'a str,
    pub approver_id: Option<&'a str>,
    pub amount_approved: Option<f64>,
    pub approval_date: Option<&'a str>,
    pub comments: Option<&'a str>,
    pub auto_approved: i32,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Review queue record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::review_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewQueueRecord {
    pub id: String,
    pub invoice_id: String,
    pub reason: String,
    pub priority: String,
    pub confidence_score: Option<f64>,
    pub flagged_fields: String,
    pub assigned_to: Option<String>,
    pub resolved_at: Option<String>,
    pub resolution: Option<String>,
    pub created_at: String,
}

/// New review queue entry for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::review_queue)]
pub struct NewReviewQueueEntry<'a> {
    pub id: &'a str,
    pub invoice_id: &'a str,
    pub reason: &'a str,
    pub priority: &'a str,
    pub confidence_score: Option<f64>,
    pub flagged_fields: &'a str,
    pub assigned_to: Option<&'a str>,
    pub resolved_at: Option<&'a str>,
    pub resolution: Option<&'a str>,
    pub created_at: &'a str,
}

/// Fraud flag record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::fraud_flags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FraudFlagRecord {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub flag_type: String,
    pub risk_score: f64,
    pub details: String,
    pub status: String,
    pub resolved_at: Option<String>,
    pub resolution: Option<String>,
    pub created_at: String,
}

/// New fraud flag for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::fraud_flags)]
pub struct NewFraudFlag<'a> {
    pub id: &'a str,
    pub entity_type: &'a str,
    pub entity_id: &'a str,
    pub flag_type: &'a str,
    pub risk_score: f64,
    pub details: &'a str,
    pub status: &'a str,
    pub resolved_at: Option<&'a str>,
    pub resolution: Option<&'a str>,
    pub created_at: &'a str,
}

/// Audit log record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::audit_log)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AuditRecord {
    pub id: i32,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub actor_id: Option<String>,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub created_at: String,
}

/// New audit entry for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::audit_log)]
pub struct NewAuditEntry<'a> {
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: &'a str,
    pub actor_id: Option<&'a str>,
    pub old_values: Option<&'a str>,
    pub new_values: Option<&'a str>,
    pub created_at: &'a str,
}
