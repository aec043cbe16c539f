//! Policy engine: ordered rule evaluation and routing decision.
//!
//! Policies evaluate strictly in ascending priority order. A triggering
//! `block_processing` policy short-circuits the remainder; a failing
//! policy is isolated and treated as non-triggering. All record writes are
//! deferred until the decision is final and applied in one transaction.

use thiserror::Error;
use tracing::{info, warn};

use crate::models::{
    Actor, FraudFlagSpec, Policy, PolicyCondition, PolicyType, RoutingDecision,
};
use crate::repository::routing::RoutingPlan;
use crate::repository::{
    DieselError, PolicyRepository, RoutingOutcome, RoutingRepository, VendorRepository,
};

/// Errors surfaced by the policy-evaluation entrypoint.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The policy set could not be loaded at all; the caller must treat
    /// the invoice as blocked. No records were written.
    #[error("failed to load policies: {0}")]
    PolicyLoad(DieselError),
    #[error(transparent)]
    Db(#[from] DieselError),
}

/// Invoice context supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFacts {
    pub amount: f64,
    pub vendor_id: Option<String>,
    pub confidence_score: Option<f64>,
}

/// Per-policy evaluation result, for explainability.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PolicyEvaluation {
    pub policy_id: String,
    pub policy_name: String,
    pub triggered: bool,
    pub detail: String,
}

/// The engine's full answer for one invoice.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub invoice_id: String,
    pub decision: RoutingDecision,
    pub required_approvals: u32,
    pub routing_reason: String,
    pub evaluations: Vec<PolicyEvaluation>,
    pub outcome: RoutingOutcome,
}

/// The policy-evaluation stage of the pipeline.
pub struct PolicyEngine {
    policies: PolicyRepository,
    vendors: VendorRepository,
    routing: RoutingRepository,
}

impl PolicyEngine {
    pub fn new(
        policies: PolicyRepository,
        vendors: VendorRepository,
        routing: RoutingRepository,
    ) -> Self {
        Self {
            policies,
            vendors,
            routing,
        }
    }

    /// Evaluate active policies against an invoice and materialize the
    /// routing decision.
    pub async fn evaluate(
        &self,
        actor: &Actor,
        invoice_id: &str,
        facts: &InvoiceFacts,
        policy_types: Option<&[PolicyType]>,
    ) -> Result<EvaluationReport, EngineError> {
        let default_types = [PolicyType::Approval, PolicyType::Fraud];
        let types = policy_types.unwrap_or(&default_types);

        let policies = self
            .policies
            .load_active(&actor.org_id, types)
            .await
            .map_err(EngineError::PolicyLoad)?;

        let mut decision = RoutingDecision::AutoApprove;
        let mut required_approvals: u32 = 0;
        let mut routing_reason = "All policies passed".to_string();
        let mut triggered_policies: Vec<String> = Vec::new();
        let mut fraud_flags: Vec<(FraudFlagSpec, String)> = Vec::new();
        let mut evaluations: Vec<PolicyEvaluation> = Vec::new();

        for policy in &policies {
            // A single failing policy must not abort the evaluation.
            let (triggered, detail) = match self.evaluate_policy(actor, policy, facts).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Policy {} evaluation failed: {}", policy.id, e);
                    (false, format!("evaluation failed: {}", e))
                }
            };

            evaluations.push(PolicyEvaluation {
                policy_id: policy.id.clone(),
                policy_name: policy.name.clone(),
                triggered,
                detail,
            });

            if !triggered {
                continue;
            }
            triggered_policies.push(policy.name.clone());

            if let Some(spec) = &policy.actions.create_fraud_flag {
                // Additive; never suppressed by later policies.
                fraud_flags.push((spec.clone(), policy.name.clone()));
            }

            if let Some(n) = policy.actions.require_approvals {
                required_approvals = required_approvals.max(n);
                if decision.rank() <= RoutingDecision::RequireApproval.rank() {
                    decision = RoutingDecision::RequireApproval;
                    routing_reason = format!("Policy '{}' requires approval", policy.name);
                }
            }

            if policy.actions.flag_for_review && decision.rank() <= RoutingDecision::FlagForReview.rank()
            {
                decision = RoutingDecision::FlagForReview;
                routing_reason = format!("Policy '{}' flagged for review", policy.name);
            }

            if policy.actions.block_processing {
                decision = RoutingDecision::Block;
                routing_reason = format!("Policy '{}' blocked processing", policy.name);
                // Remaining lower-priority policies are not evaluated.
                break;
            }
        }

        let plan = RoutingPlan {
            invoice_id: invoice_id.to_string(),
            decision,
            required_approvals,
            routing_reason: routing_reason.clone(),
            triggered_policies,
            fraud_flags,
            invoice_amount: facts.amount,
            confidence_score: facts.confidence_score,
        };
        let outcome = self.routing.apply_decision(&plan, Some(&actor.id)).await?;

        info!(
            "Invoice {}: {} ({} policies evaluated, {} required approvals)",
            invoice_id,
            decision.as_str(),
            evaluations.len(),
            required_approvals
        );

        Ok(EvaluationReport {
            invoice_id: invoice_id.to_string(),
            decision,
            required_approvals,
            routing_reason,
            evaluations,
            outcome,
        })
    }

    /// Evaluate one policy's condition. Non-matching context never errors;
    /// only infrastructure failures propagate.
    async fn evaluate_policy(
        &self,
        actor: &Actor,
        policy: &Policy,
        facts: &InvoiceFacts,
    ) -> Result<(bool, String), DieselError> {
        match &policy.conditions {
            PolicyCondition::AmountThreshold { threshold } => {
                if facts.amount > *threshold {
                    Ok((
                        true,
                        format!("amount ${:.2} exceeds threshold ${:.2}", facts.amount, threshold),
                    ))
                } else {
                    Ok((
                        false,
                        format!(
                            "amount ${:.2} within threshold ${:.2}",
                            facts.amount, threshold
                        ),
                    ))
                }
            }
            PolicyCondition::DuplicateBankAccount => {
                let Some(vendor_id) = facts.vendor_id.as_deref() else {
                    return Ok((false, "no vendor on invoice".to_string()));
                };
                let Some(vendor) = self.vendors.get_scoped(vendor_id, &actor.org_id).await? else {
                    return Ok((false, format!("vendor {} not found", vendor_id)));
                };
                let Some(account) = vendor.bank_account.as_deref() else {
                    return Ok((false, "vendor has no bank account on file".to_string()));
                };
                let sharing = self
                    .vendors
                    .find_sharing_bank_account(&actor.org_id, account, vendor_id)
                    .await?;
                if sharing.is_empty() {
                    Ok((false, "bank account unique to this vendor".to_string()))
                } else {
                    let names: Vec<&str> = sharing.iter().map(|v| v.name.as_str()).collect();
                    Ok((
                        true,
                        format!("vendor shares bank account with: {}", names.join(", ")),
                    ))
                }
            }
            PolicyCondition::Unknown => Ok((false, "unrecognized condition type".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;
    use uuid::Uuid;

    use crate::models::{Invoice, InvoiceStatus, PolicyActions, Vendor};
    use crate::repository::DbContext;

    async fn setup() -> (DbContext, Actor, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (ctx, Actor::new("tester", "org-1"), dir)
    }

    fn engine(ctx: &DbContext) -> PolicyEngine {
        PolicyEngine::new(ctx.policies(), ctx.vendors(), ctx.routing())
    }

    async fn create_invoice(ctx: &DbContext, id: &str, amount: f64) {
        let invoice = Invoice::new(id.to_string(), "org-1".to_string(), amount, "USD".to_string());
        ctx.invoices().create(&invoice).await.unwrap();
    }

    fn policy(
        name: &str,
        priority: i32,
        policy_type: PolicyType,
        conditions: PolicyCondition,
        actions: PolicyActions,
    ) -> Policy {
        let now = Utc::now();
        Policy {
            id: Uuid::new_v4().to_string(),
            org_id: "org-1".to_string(),
            name: name.to_string(),
            policy_type,
            conditions,
            actions,
            priority,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_threshold_policy_creates_approval_levels() {
        let (ctx, actor, _dir) = setup().await;
        create_invoice(&ctx, "inv-1", 7_000.0).await;

        ctx.policies()
            .create(&policy(
                "Two approvals above $5,000",
                10,
                PolicyType::Approval,
                PolicyCondition::AmountThreshold { threshold: 5_000.0 },
                PolicyActions {
                    require_approvals: Some(2),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        let facts = InvoiceFacts {
            amount: 7_000.0,
            ..Default::default()
        };
        let report = engine(&ctx)
            .evaluate(&actor, "inv-1", &facts, None)
            .await
            .unwrap();

        assert_eq!(report.decision, RoutingDecision::RequireApproval);
        assert_eq!(report.required_approvals, 2);
        assert!(report.routing_reason.contains("Two approvals above $5,000"));

        let approvals = ctx.approvals().list_for_invoice("inv-1").await.unwrap();
        assert_eq!(approvals.len(), 2);
        assert_eq!(approvals[0].approval_level, 1);
        assert_eq!(approvals[1].approval_level, 2);
        for approval in &approvals {
            assert_eq!(approval.status, crate::models::ApprovalStatus::Pending);
            assert_eq!(approval.amount_approved, Some(7_000.0));
        }

        let invoice = ctx.invoices().get("inv-1").await.unwrap().unwrap();
        assert_eq!(invoice.status, InvoiceStatus::PendingApproval);
    }

    #[tokio::test]
    async fn test_threshold_not_exceeded_auto_approves() {
        let (ctx, actor, _dir) = setup().await;
        create_invoice(&ctx, "inv-2", 3_000.0).await;

        ctx.policies()
            .create(&policy(
                "Two approvals above $5,000",
                10,
                PolicyType::Approval,
                PolicyCondition::AmountThreshold { threshold: 5_000.0 },
                PolicyActions {
                    require_approvals: Some(2),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        let facts = InvoiceFacts {
            amount: 3_000.0,
            ..Default::default()
        };
        let report = engine(&ctx)
            .evaluate(&actor, "inv-2", &facts, None)
            .await
            .unwrap();

        assert_eq!(report.decision, RoutingDecision::AutoApprove);
        assert_eq!(report.routing_reason, "All policies passed");
        assert_eq!(report.evaluations.len(), 1);
        assert!(!report.evaluations[0].triggered);

        let invoice = ctx.invoices().get("inv-2").await.unwrap().unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Approved);
        assert!(ctx
            .approvals()
            .list_for_invoice("inv-2")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_block_short_circuits_remaining_policies() {
        let (ctx, actor, _dir) = setup().await;
        create_invoice(&ctx, "inv-3", 1_000.0).await;

        // Priority 1 blocks; priority 2 would create a fraud flag.
        ctx.policies()
            .create(&policy(
                "Hard block",
                1,
                PolicyType::Fraud,
                PolicyCondition::AmountThreshold { threshold: 0.0 },
                PolicyActions {
                    block_processing: true,
                    ..Default::default()
                },
            ))
            .await
            .unwrap();
        ctx.policies()
            .create(&policy(
                "Never reached",
                2,
                PolicyType::Fraud,
                PolicyCondition::AmountThreshold { threshold: 0.0 },
                PolicyActions {
                    create_fraud_flag: Some(FraudFlagSpec {
                        flag_type: "late".to_string(),
                        risk_score: 0.9,
                    }),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        let facts = InvoiceFacts {
            amount: 1_000.0,
            ..Default::default()
        };
        let report = engine(&ctx)
            .evaluate(&actor, "inv-3", &facts, None)
            .await
            .unwrap();

        assert_eq!(report.decision, RoutingDecision::Block);
        // The second policy was never evaluated.
        assert_eq!(report.evaluations.len(), 1);
        // And its fraud flag was never created.
        let flags = ctx
            .reviews()
            .list_flags_for_entity("invoice", "inv-3")
            .await
            .unwrap();
        assert!(flags.is_empty());
    }

    #[tokio::test]
    async fn test_fraud_policy_flags_and_reviews() {
        let (ctx, actor, _dir) = setup().await;
        create_invoice(&ctx, "inv-4", 2_000.0).await;

        let vendors = ctx.vendors();
        for (id, name) in [("v-1", "Acme"), ("v-2", "Shadow Acme")] {
            vendors
                .create(&Vendor::new(
                    id.to_string(),
                    "org-1".to_string(),
                    name.to_string(),
                    Some("ACCT-9".to_string()),
                ))
                .await
                .unwrap();
        }

        ctx.policies()
            .create(&policy(
                "Duplicate payee instrument",
                5,
                PolicyType::Fraud,
                PolicyCondition::DuplicateBankAccount,
                PolicyActions {
                    flag_for_review: true,
                    create_fraud_flag: Some(FraudFlagSpec {
                        flag_type: "duplicate_bank_account".to_string(),
                        risk_score: 0.85,
                    }),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        let facts = InvoiceFacts {
            amount: 2_000.0,
            vendor_id: Some("v-1".to_string()),
            confidence_score: Some(0.62),
        };
        let report = engine(&ctx)
            .evaluate(&actor, "inv-4", &facts, None)
            .await
            .unwrap();

        assert_eq!(report.decision, RoutingDecision::FlagForReview);
        assert!(report.evaluations[0].detail.contains("Shadow Acme"));

        let entries = ctx.reviews().list_for_invoice("inv-4").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].confidence_score, Some(0.62));
        assert!(entries[0]
            .flagged_fields
            .contains(&"Duplicate payee instrument".to_string()));

        let flags = ctx
            .reviews()
            .list_flags_for_entity("invoice", "inv-4")
            .await
            .unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].flag_type, "duplicate_bank_account");
        assert!((flags[0].risk_score - 0.85).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unique_bank_account_does_not_trigger() {
        let (ctx, actor, _dir) = setup().await;
        create_invoice(&ctx, "inv-5", 2_000.0).await;

        ctx.vendors()
            .create(&Vendor::new(
                "v-9".to_string(),
                "org-1".to_string(),
                "Solo Vendor".to_string(),
                Some("ACCT-UNIQUE".to_string()),
            ))
            .await
            .unwrap();

        ctx.policies()
            .create(&policy(
                "Duplicate payee instrument",
                5,
                PolicyType::Fraud,
                PolicyCondition::DuplicateBankAccount,
                PolicyActions {
                    flag_for_review: true,
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        let facts = InvoiceFacts {
            amount: 2_000.0,
            vendor_id: Some("v-9".to_string()),
            ..Default::default()
        };
        let report = engine(&ctx)
            .evaluate(&actor, "inv-5", &facts, None)
            .await
            .unwrap();

        assert_eq!(report.decision, RoutingDecision::AutoApprove);
        assert!(!report.evaluations[0].triggered);
    }

    #[tokio::test]
    async fn test_unknown_condition_is_isolated() {
        let (ctx, actor, _dir) = setup().await;
        create_invoice(&ctx, "inv-6", 9_000.0).await;

        ctx.policies()
            .create(&policy(
                "Future condition",
                1,
                PolicyType::Approval,
                PolicyCondition::Unknown,
                PolicyActions {
                    require_approvals: Some(5),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();
        ctx.policies()
            .create(&policy(
                "Amount gate",
                2,
                PolicyType::Approval,
                PolicyCondition::AmountThreshold { threshold: 5_000.0 },
                PolicyActions {
                    require_approvals: Some(1),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        let facts = InvoiceFacts {
            amount: 9_000.0,
            ..Default::default()
        };
        let report = engine(&ctx)
            .evaluate(&actor, "inv-6", &facts, None)
            .await
            .unwrap();

        // The unrecognized policy did not trigger and did not abort the run.
        assert_eq!(report.evaluations.len(), 2);
        assert!(!report.evaluations[0].triggered);
        assert!(report.evaluations[1].triggered);
        assert_eq!(report.decision, RoutingDecision::RequireApproval);
        assert_eq!(report.required_approvals, 1);
    }

    #[tokio::test]
    async fn test_required_approvals_merges_to_max() {
        let (ctx, actor, _dir) = setup().await;
        create_invoice(&ctx, "inv-7", 50_000.0).await;

        for (name, priority, n) in [("Gate A", 1, 2), ("Gate B", 2, 3), ("Gate C", 3, 1)] {
            ctx.policies()
                .create(&policy(
                    name,
                    priority,
                    PolicyType::Approval,
                    PolicyCondition::AmountThreshold { threshold: 10_000.0 },
                    PolicyActions {
                        require_approvals: Some(n),
                        ..Default::default()
                    },
                ))
                .await
                .unwrap();
        }

        let facts = InvoiceFacts {
            amount: 50_000.0,
            ..Default::default()
        };
        let report = engine(&ctx)
            .evaluate(&actor, "inv-7", &facts, None)
            .await
            .unwrap();

        assert_eq!(report.required_approvals, 3);
        let approvals = ctx.approvals().list_for_invoice("inv-7").await.unwrap();
        assert_eq!(approvals.len(), 3);
    }
}
