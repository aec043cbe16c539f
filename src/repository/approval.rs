//! Approval repository.
//!
//! A decision is one transaction: terminal guard, sequential-gating check,
//! row mutation, invoice advancement, ledger post, and audit entry either
//! all commit or none do. Concurrent decisions against the same invoice
//! serialize on the database, so a rejection veto holds under races.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use thiserror::Error;

use super::audit;
use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::ApprovalRecord;
use crate::models::{Approval, ApprovalDecision, ApprovalStatus, InvoiceStatus};
use crate::schema::{afes, approvals, invoice_extractions, invoices};

/// Why a decision could not be applied.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("approval not found")]
    NotFound,
    #[error("approval is already {0}")]
    AlreadyDecided(String),
    #[error("approval level {lower} is still pending")]
    OutOfOrder { lower: u32 },
    #[error(transparent)]
    Db(#[from] DieselError),
}

/// Result of a successfully applied decision.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub approval: Approval,
    pub invoice_status: InvoiceStatus,
    /// True when this decision settled the whole chain.
    pub finalized: bool,
    /// Remaining AFE budget after the finalization post, when one happened.
    pub ledger_remaining: Option<f64>,
}

/// Diesel-based approval repository.
#[derive(Clone)]
pub struct ApprovalRepository {
    pool: AsyncSqlitePool,
}

impl ApprovalRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn record_to_approval(record: ApprovalRecord) -> Approval {
        Approval {
            status: ApprovalStatus::from_str(&record.status).unwrap_or(ApprovalStatus::Pending),
            approval_date: super::parse_datetime_opt(record.approval_date),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
            approval_level: record.approval_level.max(0) as u32,
            auto_approved: record.auto_approved != 0,
            id: record.id,
            invoice_id: record.invoice_id,
            approver_id: record.approver_id,
            amount_approved: record.amount_approved,
            comments: record.comments,
        }
    }

    /// Get an approval by id.
    pub async fn get(&self, id: &str) -> Result<Option<Approval>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<ApprovalRecord> = approvals::table
            .find(id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Self::record_to_approval))
    }

    /// List an invoice's approval chain, lowest level first.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> Result<Vec<Approval>, DieselError> {
        let mut conn = self.pool.get().await?;
        let records: Vec<ApprovalRecord> = approvals::table
            .filter(approvals::invoice_id.eq(invoice_id))
            .order(approvals::approval_level.asc())
            .load(&mut conn)
            .await?;
        Ok(records.into_iter().map(Self::record_to_approval).collect())
    }

    /// Apply a human decision to a pending approval.
    ///
    /// Comments validation belongs to the workflow service; this method
    /// enforces the state-machine invariants that need the database view:
    /// terminal rows stay terminal, lower levels gate higher ones, a
    /// rejection vetoes the whole chain, and the final approval advances
    /// the invoice and posts spend to the AFE ledger.
    pub async fn decide(
        &self,
        approval_id: &str,
        decision: ApprovalDecision,
        approver_id: &str,
        comments: Option<&str>,
    ) -> Result<DecisionOutcome, DecisionError> {
        let now = Utc::now().to_rfc3339();

        let mut conn = self.pool.get().await.map_err(DecisionError::Db)?;
        let outcome = conn
            .transaction::<_, DecisionError, _>(|conn| {
                let now = &now;
                async move {
                    let record: ApprovalRecord = approvals::table
                        .find(approval_id)
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or(DecisionError::NotFound)?;

                    if record.status != ApprovalStatus::Pending.as_str() {
                        return Err(DecisionError::AlreadyDecided(record.status));
                    }

                    if decision == ApprovalDecision::Approved {
                        let lower_pending: Option<i32> = approvals::table
                            .filter(approvals::invoice_id.eq(&record.invoice_id))
                            .filter(approvals::status.eq(ApprovalStatus::Pending.as_str()))
                            .filter(approvals::approval_level.lt(record.approval_level))
                            .select(diesel::dsl::min(approvals::approval_level))
                            .first(conn)
                            .await?;
                        if let Some(lower) = lower_pending {
                            return Err(DecisionError::OutOfOrder {
                                lower: lower.max(0) as u32,
                            });
                        }
                    }

                    let new_status = match decision {
                        ApprovalDecision::Approved => ApprovalStatus::Approved,
                        ApprovalDecision::Rejected => ApprovalStatus::Rejected,
                    };

                    diesel::update(approvals::table.find(approval_id))
                        .set((
                            approvals::status.eq(new_status.as_str()),
                            approvals::approver_id.eq(approver_id),
                            approvals::approval_date.eq(now),
                            approvals::comments.eq(comments),
                            approvals::updated_at.eq(now),
                        ))
                        .execute(conn)
                        .await?;

                    let remaining_pending: i64 = approvals::table
                        .filter(approvals::invoice_id.eq(&record.invoice_id))
                        .filter(approvals::status.eq(ApprovalStatus::Pending.as_str()))
                        .count()
                        .get_result(conn)
                        .await?;

                    let mut ledger_remaining = None;
                    let (invoice_status, finalized) = match decision {
                        // A single rejection vetoes the whole chain.
                        ApprovalDecision::Rejected => (InvoiceStatus::Rejected, true),
                        ApprovalDecision::Approved if remaining_pending == 0 => {
                            (InvoiceStatus::Approved, true)
                        }
                        ApprovalDecision::Approved => (InvoiceStatus::PendingApproval, false),
                    };

                    if finalized {
                        diesel::update(invoices::table.find(&record.invoice_id))
                            .set((
                                invoices::status.eq(invoice_status.as_str()),
                                invoices::updated_at.eq(now),
                            ))
                            .execute(conn)
                            .await?;
                    }

                    if finalized && invoice_status == InvoiceStatus::Approved {
                        ledger_remaining =
                            Self::post_final_spend(conn, &record, now).await?;
                    }

                    let action = match decision {
                        ApprovalDecision::Approved => "approval.approved",
                        ApprovalDecision::Rejected => "approval.rejected",
                    };
                    let summary = serde_json::json!({
                        "approval_id": approval_id,
                        "approval_level": record.approval_level,
                        "comments": comments,
                        "invoice_status": invoice_status.as_str(),
                        "ledger_remaining": ledger_remaining,
                    });
                    audit::insert_entry(
                        conn,
                        action,
                        "invoice",
                        &record.invoice_id,
                        Some(approver_id),
                        None,
                        Some(&summary),
                    )
                    .await?;

                    let updated: ApprovalRecord =
                        approvals::table.find(approval_id).first(conn).await?;
                    Ok(DecisionOutcome {
                        approval: Self::record_to_approval(updated),
                        invoice_status,
                        finalized,
                        ledger_remaining,
                    })
                }
                .scope_boxed()
            })
            .await?;

        Ok(outcome)
    }

    /// Post the settled invoice amount to the AFE the latest completed
    /// extraction resolved, if any. Runs on the decision transaction.
    async fn post_final_spend(
        conn: &mut super::pool::AsyncSqliteConnection,
        record: &ApprovalRecord,
        now: &str,
    ) -> Result<Option<f64>, DieselError> {
        let afe_id: Option<Option<String>> = invoice_extractions::table
            .filter(invoice_extractions::invoice_id.eq(&record.invoice_id))
            .filter(
                invoice_extractions::extraction_status
                    .eq(crate::models::ExtractionStatus::Completed.as_str()),
            )
            .order(invoice_extractions::created_at.desc())
            .select(invoice_extractions::afe_id)
            .first(conn)
            .await
            .optional()?;

        let Some(Some(afe_id)) = afe_id else {
            return Ok(None);
        };

        let amount = match record.amount_approved {
            Some(amount) => amount,
            None => {
                invoices::table
                    .find(&record.invoice_id)
                    .select(invoices::amount)
                    .first(conn)
                    .await?
            }
        };

        diesel::update(afes::table.find(&afe_id))
            .set((
                afes::spent_amount.eq(afes::spent_amount + amount),
                afes::updated_at.eq(now),
            ))
            .execute(conn)
            .await?;

        let (budget, spent): (f64, f64) = afes::table
            .find(&afe_id)
            .select((afes::budget_amount, afes::spent_amount))
            .first(conn)
            .await?;
        Ok(Some(budget - spent))
    }
}
