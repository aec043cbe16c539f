//! Audit log entries.
//!
//! Every meaningful state transition in the pipeline writes exactly one
//! entry, inside the same transaction as the mutation it records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    /// Action name, e.g. `invoice.extraction_completed`.
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    /// Acting user; `None` means the system itself.
    pub actor_id: Option<String>,
    /// JSON snapshot before the mutation.
    pub old_values: Option<serde_json::Value>,
    /// JSON snapshot after the mutation.
    pub new_values: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
