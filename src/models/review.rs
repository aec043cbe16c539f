//! Human-review queue entries and fraud flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Urgency of a review queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPriority {
    Low,
    Normal,
    High,
}

impl ReviewPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// An invoice flagged for human attention (the HIL queue).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewQueueEntry {
    pub id: String,
    pub invoice_id: String,
    /// Why the invoice was flagged; names the triggering policies.
    pub reason: String,
    pub priority: ReviewPriority,
    pub confidence_score: Option<f64>,
    /// Fields the reviewer should look at first.
    pub flagged_fields: Vec<String>,
    pub assigned_to: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Status of a fraud flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudFlagStatus {
    Open,
    Resolved,
    Dismissed,
}

impl FraudFlagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }
}

/// A fraud signal raised against an entity by a triggered fraud policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudFlag {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub flag_type: String,
    pub risk_score: f64,
    pub details: String,
    pub status: FraudFlagStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
}
