//! Vendor registry model.
//!
//! Vendors are maintained by CRUD flows outside this core; the policy
//! engine consumes the registry for duplicate-payee-instrument checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A vendor that submits invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: String,
    pub org_id: String,
    pub name: String,
    /// Bank account identifier used for payment, if on file.
    pub bank_account: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Vendor {
    pub fn new(id: String, org_id: String, name: String, bank_account: Option<String>) -> Self {
        Self {
            id,
            org_id,
            name,
            bank_account,
            created_at: Utc::now(),
        }
    }
}
