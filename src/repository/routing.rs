//! Materializes a policy-engine routing decision.
//!
//! The invoice status update, the approval rows, the review-queue entry,
//! the fraud flags, and the audit entry all commit in one transaction: a
//! crash can never leave an invoice in `pending_approval` with zero
//! approval rows.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use super::audit;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{NewApproval, NewFraudFlag, NewReviewQueueEntry};
use crate::models::{
    ApprovalStatus, FraudFlagSpec, FraudFlagStatus, InvoiceStatus, ReviewPriority, RoutingDecision,
};
use crate::schema::{approvals, fraud_flags, invoices, review_queue};

/// Everything a finalized decision writes.
#[derive(Debug, Clone)]
pub struct RoutingPlan {
    pub invoice_id: String,
    pub decision: RoutingDecision,
    pub required_approvals: u32,
    pub routing_reason: String,
    /// Names of every policy that triggered, in evaluation order.
    pub triggered_policies: Vec<String>,
    /// Fraud flags queued by triggered policies: (spec, policy name).
    pub fraud_flags: Vec<(FraudFlagSpec, String)>,
    pub invoice_amount: f64,
    pub confidence_score: Option<f64>,
}

/// Ids of the records a decision produced.
#[derive(Debug, Clone, Default)]
pub struct RoutingOutcome {
    pub invoice_status: Option<InvoiceStatus>,
    pub approval_ids: Vec<String>,
    pub review_entry_id: Option<String>,
    pub fraud_flag_ids: Vec<String>,
}

/// Diesel-based writer for routing decisions.
#[derive(Clone)]
pub struct RoutingRepository {
    pool: AsyncSqlitePool,
}

impl RoutingRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Apply a finalized routing decision atomically.
    pub async fn apply_decision(
        &self,
        plan: &RoutingPlan,
        actor_id: Option<&str>,
    ) -> Result<RoutingOutcome, DieselError> {
        let now = Utc::now().to_rfc3339();

        let invoice_status = match plan.decision {
            RoutingDecision::AutoApprove => InvoiceStatus::Approved,
            _ => InvoiceStatus::PendingApproval,
        };

        let approval_ids: Vec<String> = if plan.decision == RoutingDecision::RequireApproval {
            (0..plan.required_approvals)
                .map(|_| Uuid::new_v4().to_string())
                .collect()
        } else {
            Vec::new()
        };
        let review_entry_id = (plan.decision == RoutingDecision::FlagForReview)
            .then(|| Uuid::new_v4().to_string());
        let fraud_flag_ids: Vec<String> = plan
            .fraud_flags
            .iter()
            .map(|_| Uuid::new_v4().to_string())
            .collect();

        let audit_summary = serde_json::json!({
            "decision": plan.decision.as_str(),
            "required_approvals": plan.required_approvals,
            "triggered_policies": plan.triggered_policies.len(),
            "routing_reason": plan.routing_reason,
        });

        let mut conn = self.pool.get().await?;
        conn.transaction::<_, DieselError, _>(|conn| {
            let approval_ids = &approval_ids;
            let review_entry_id = &review_entry_id;
            let fraud_flag_ids = &fraud_flag_ids;
            let now = &now;
            async move {
                diesel::update(invoices::table.find(&plan.invoice_id))
                    .set((
                        invoices::status.eq(invoice_status.as_str()),
                        invoices::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .await?;

                for (idx, id) in approval_ids.iter().enumerate() {
                    diesel::insert_into(approvals::table)
                        .values(&NewApproval {
                            id,
                            invoice_id: &plan.invoice_id,
                            approval_level: idx as i32 + 1,
                            status: ApprovalStatus::Pending.as_str(),
                            approver_id: None,
                            // Proposed, not yet confirmed.
                            amount_approved: Some(plan.invoice_amount),
                            approval_date: None,
                            comments: None,
                            auto_approved: 0,
                            created_at: now,
                            updated_at: now,
                        })
                        .execute(conn)
                        .await?;
                }

                if let Some(entry_id) = review_entry_id.as_deref() {
                    let flagged_fields = serde_json::to_string(&plan.triggered_policies)
                        .unwrap_or_else(|_| "[]".to_string());
                    let priority = if plan.fraud_flags.is_empty() {
                        ReviewPriority::Normal
                    } else {
                        ReviewPriority::High
                    };
                    diesel::insert_into(review_queue::table)
                        .values(&NewReviewQueueEntry {
                            id: entry_id,
                            invoice_id: &plan.invoice_id,
                            reason: &plan.routing_reason,
                            priority: priority.as_str(),
                            confidence_score: plan.confidence_score,
                            flagged_fields: &flagged_fields,
                            assigned_to: None,
                            resolved_at: None,
                            resolution: None,
                            created_at: now,
                        })
                        .execute(conn)
                        .await?;
                }

                for (id, (spec, policy_name)) in
                    fraud_flag_ids.iter().zip(plan.fraud_flags.iter())
                {
                    let details = format!("Raised by policy '{}'", policy_name);
                    diesel::insert_into(fraud_flags::table)
                        .values(&NewFraudFlag {
                            id,
                            entity_type: "invoice",
                            entity_id: &plan.invoice_id,
                            flag_type: &spec.flag_type,
                            risk_score: spec.risk_score,
                            details: &details,
                            status: FraudFlagStatus::Open.as_str(),
                            resolved_at: None,
                            resolution: None,
                            created_at: now,
                        })
                        .execute(conn)
                        .await?;
                }

                audit::insert_entry(
                    conn,
                    "invoice.policy_decision",
                    "invoice",
                    &plan.invoice_id,
                    actor_id,
                    None,
                    Some(&audit_summary),
                )
                .await
            }
            .scope_boxed()
        })
        .await?;

        Ok(RoutingOutcome {
            invoice_status: Some(invoice_status),
            approval_ids,
            review_entry_id,
            fraud_flag_ids,
        })
    }
}
