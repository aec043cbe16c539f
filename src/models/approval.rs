//! Approval rows for the multi-level approval state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of one approval level. `pending` transitions once, to either
/// terminal state; terminal rows are never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A human decision supplied against a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl ApprovalDecision {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// One level of an invoice's approval chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    pub invoice_id: String,
    /// 1..N; level 1 approves first.
    pub approval_level: u32,
    pub status: ApprovalStatus,
    pub approver_id: Option<String>,
    /// Proposed amount, pre-populated from the invoice; confirmed by the
    /// approving action.
    pub amount_approved: Option<f64>,
    pub approval_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub auto_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
