//! AFE (Authorization for Expenditure) and well registry models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an AFE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfeStatus {
    Active,
    Closed,
    Cancelled,
}

impl AfeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "closed" => Some(Self::Closed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A capital budget envelope for a project or well.
///
/// `spent_amount <= budget_amount` holds under normal operation; a breach
/// is permitted but must surface as `over_budget` plus a validation error,
/// never silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Afe {
    pub id: String,
    pub org_id: String,
    pub afe_number: String,
    pub description: Option<String>,
    pub budget_amount: f64,
    pub spent_amount: f64,
    pub status: AfeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Afe {
    pub fn new(id: String, org_id: String, afe_number: String, budget_amount: f64) -> Self {
        let now = Utc::now();
        Self {
            id,
            org_id,
            afe_number,
            description: None,
            budget_amount,
            spent_amount: 0.0,
            status: AfeStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Remaining headroom before the budget ceiling.
    pub fn remaining(&self) -> f64 {
        self.budget_amount - self.spent_amount
    }
}

/// Result of an atomic budget reservation against an AFE.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetReservation {
    /// Whether the reservation fit inside the budget and was applied.
    pub ok: bool,
    /// Remaining budget after the attempt (unchanged when `ok` is false).
    pub remaining: f64,
}

/// A registered well, keyed by its unique well identifier (UWI).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Well {
    pub id: String,
    pub org_id: String,
    pub uwi: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Well {
    pub fn new(id: String, org_id: String, uwi: String, name: String) -> Self {
        Self {
            id,
            org_id,
            uwi,
            name,
            created_at: Utc::now(),
        }
    }
}
