//! Append-only audit log repository.
//!
//! Business repositories call `insert_entry` on their own connection so
//! the audit row commits atomically with the mutation it records. The
//! standalone `append` exists for collaborators that only need the sink
//! contract.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::parse_datetime;
use super::pool::{AsyncSqliteConnection, AsyncSqlitePool, DieselError};
use super::records::{AuditRecord, NewAuditEntry};
use crate::models::AuditEntry;
use crate::schema::audit_log;

/// Write one audit entry on an existing connection (inside a transaction).
pub(crate) async fn insert_entry(
    conn: &mut AsyncSqliteConnection,
    action: &str,
    entity_type: &str,
    entity_id: &str,
    actor_id: Option<&str>,
    old_values: Option<&serde_json::Value>,
    new_values: Option<&serde_json::Value>,
) -> Result<(), DieselError> {
    let created_at = Utc::now().to_rfc3339();
    let old = old_values.map(|v| v.to_string());
    let new = new_values.map(|v| v.to_string());

    diesel::insert_into(audit_log::table)
        .values(&NewAuditEntry {
            action,
            entity_type,
            entity_id,
            actor_id,
            old_values: old.as_deref(),
            new_values: new.as_deref(),
            created_at: &created_at,
        })
        .execute(conn)
        .await?;
    Ok(())
}

/// Diesel-based audit log repository.
#[derive(Clone)]
pub struct AuditRepository {
    pool: AsyncSqlitePool,
}

impl AuditRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    fn record_to_entry(record: AuditRecord) -> AuditEntry {
        AuditEntry {
            id: record.id as i64,
            created_at: parse_datetime(&record.created_at),
            old_values: record
                .old_values
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok()),
            new_values: record
                .new_values
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok()),
            action: record.action,
            entity_type: record.entity_type,
            entity_id: record.entity_id,
            actor_id: record.actor_id,
        }
    }

    /// Append a standalone audit entry.
    pub async fn append(
        &self,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        actor_id: Option<&str>,
        old_values: Option<&serde_json::Value>,
        new_values: Option<&serde_json::Value>,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        insert_entry(
            &mut conn,
            action,
            entity_type,
            entity_id,
            actor_id,
            old_values,
            new_values,
        )
        .await
    }

    /// List entries for one entity, oldest first.
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, DieselError> {
        let mut conn = self.pool.get().await?;
        let records: Vec<AuditRecord> = audit_log::table
            .filter(audit_log::entity_type.eq(entity_type))
            .filter(audit_log::entity_id.eq(entity_id))
            .order(audit_log::id.asc())
            .load(&mut conn)
            .await?;
        Ok(records.into_iter().map(Self::record_to_entry).collect())
    }
}
