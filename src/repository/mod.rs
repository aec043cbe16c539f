//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking
//! over SQLite. Multi-entity state transitions (extraction persistence,
//! routing-decision application, approval decisions) run inside a single
//! transaction together with their audit entry, so a crash can never leave
//! a partially applied transition or an unaudited one.

pub mod afe;
pub mod approval;
pub mod audit;
pub mod context;
pub mod extraction;
pub mod invoice;
pub mod policy;
pub mod pool;
pub mod records;
pub mod review;
pub mod routing;
pub mod vendor;

pub use afe::AfeRepository;
pub use approval::{ApprovalRepository, DecisionError, DecisionOutcome};
pub use audit::AuditRepository;
pub use context::DbContext;
pub use extraction::ExtractionRepository;
pub use invoice::InvoiceRepository;
pub use policy::PolicyRepository;
pub use pool::{AsyncSqlitePool, DieselError};
pub use review::ReviewRepository;
pub use routing::{RoutingOutcome, RoutingRepository};
pub use vendor::VendorRepository;

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Decode a JSON string-list column, tolerating legacy empty values.
pub(crate) fn parse_string_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
