//! Policy model: typed conditions, actions, and routing decisions.
//!
//! Rule logic is modeled as closed tagged-variant types rather than
//! free-form JSON. Each condition variant has one evaluation function in
//! the policy engine; unknown variants deserialize to `Unknown` and never
//! trigger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a policy. Governs which entrypoints evaluate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    Approval,
    Fraud,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approval => "approval",
            Self::Fraud => "fraud",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approval" => Some(Self::Approval),
            "fraud" => Some(Self::Fraud),
            _ => None,
        }
    }
}

/// Structured predicate evaluated against invoice context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyCondition {
    /// Triggers when the invoice amount exceeds the threshold.
    AmountThreshold { threshold: f64 },
    /// Triggers when the invoice's vendor shares a bank-account identifier
    /// with another vendor (duplicate payee instrument).
    DuplicateBankAccount,
    /// Condition kinds this build does not recognize. Never triggers.
    #[serde(other)]
    Unknown,
}

/// Fraud flag to create when the owning policy triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudFlagSpec {
    pub flag_type: String,
    pub risk_score: f64,
}

/// Effects applied when a policy triggers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyActions {
    /// Raise the invoice's required approval count to at least this value.
    #[serde(default)]
    pub require_approvals: Option<u32>,
    /// Route the invoice to the human review queue.
    #[serde(default)]
    pub flag_for_review: bool,
    /// Block processing outright and stop evaluating further policies.
    #[serde(default)]
    pub block_processing: bool,
    /// Create a fraud flag. Always applied when the policy triggers,
    /// whatever the final routing decision.
    #[serde(default)]
    pub create_fraud_flag: Option<FraudFlagSpec>,
}

/// An active routing rule. Read-only to this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub policy_type: PolicyType,
    pub conditions: PolicyCondition,
    pub actions: PolicyActions,
    /// Lower priority evaluates earlier.
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The policy engine's single routing classification for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    AutoApprove,
    RequireApproval,
    FlagForReview,
    Block,
}

impl RoutingDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoApprove => "auto_approve",
            Self::RequireApproval => "require_approval",
            Self::FlagForReview => "flag_for_review",
            Self::Block => "block",
        }
    }

    /// Severity rank; decisions only escalate during evaluation.
    pub fn rank(&self) -> u8 {
        match self {
            Self::AutoApprove => 0,
            Self::RequireApproval => 1,
            Self::FlagForReview => 2,
            Self::Block => 3,
        }
    }
}
