//! Review queue and fraud flag reads.
//!
//! Entries are created by the routing repository inside the decision
//! transaction; this repository serves the read side (the HIL queue) and
//! resolution updates.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{FraudFlagRecord, ReviewQueueRecord};
use super::{parse_datetime, parse_datetime_opt, parse_string_list};
use crate::models::{FraudFlag, FraudFlagStatus, ReviewPriority, ReviewQueueEntry};
use crate::schema::{fraud_flags, review_queue};

/// Diesel-based review queue repository.
#[derive(Clone)]
pub struct ReviewRepository {
    pool: AsyncSqlitePool,
}

impl ReviewRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    fn record_to_entry(record: ReviewQueueRecord) -> ReviewQueueEntry {
        ReviewQueueEntry {
            priority: ReviewPriority::from_str(&record.priority)
                .unwrap_or(ReviewPriority::Normal),
            flagged_fields: parse_string_list(&record.flagged_fields),
            resolved_at: parse_datetime_opt(record.resolved_at),
            created_at: parse_datetime(&record.created_at),
            id: record.id,
            invoice_id: record.invoice_id,
            reason: record.reason,
            confidence_score: record.confidence_score,
            assigned_to: record.assigned_to,
            resolution: record.resolution,
        }
    }

    fn record_to_flag(record: FraudFlagRecord) -> FraudFlag {
        FraudFlag {
            status: FraudFlagStatus::from_str(&record.status).unwrap_or(FraudFlagStatus::Open),
            resolved_at: parse_datetime_opt(record.resolved_at),
            created_at: parse_datetime(&record.created_at),
            id: record.id,
            entity_type: record.entity_type,
            entity_id: record.entity_id,
            flag_type: record.flag_type,
            risk_score: record.risk_score,
            details: record.details,
            resolution: record.resolution,
        }
    }

    /// List unresolved review entries, oldest first.
    pub async fn list_open(&self) -> Result<Vec<ReviewQueueEntry>, DieselError> {
        let mut conn = self.pool.get().await?;
        let records: Vec<ReviewQueueRecord> = review_queue::table
            .filter(review_queue::resolved_at.is_null())
            .order(review_queue::created_at.asc())
            .load(&mut conn)
            .await?;
        Ok(records.into_iter().map(Self::record_to_entry).collect())
    }

    /// List review entries for an invoice.
    pub async fn list_for_invoice(
        &self,
        invoice_id: &str,
    ) -> Result<Vec<ReviewQueueEntry>, DieselError> {
        let mut conn = self.pool.get().await?;
        let records: Vec<ReviewQueueRecord> = review_queue::table
            .filter(review_queue::invoice_id.eq(invoice_id))
            .order(review_queue::created_at.asc())
            .load(&mut conn)
            .await?;
        Ok(records.into_iter().map(Self::record_to_entry).collect())
    }

    /// Mark a review entry resolved.
    pub async fn resolve(&self, id: &str, resolution: &str) -> Result<(), DieselError> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.pool.get().await?;
        diesel::update(review_queue::table.find(id))
            .set((
                review_queue::resolved_at.eq(&now),
                review_queue::resolution.eq(resolution),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// List fraud flags recorded against an entity.
    pub async fn list_flags_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<FraudFlag>, DieselError> {
        let mut conn = self.pool.get().await?;
        let records: Vec<FraudFlagRecord> = fraud_flags::table
            .filter(fraud_flags::entity_type.eq(entity_type))
            .filter(fraud_flags::entity_id.eq(entity_id))
            .order(fraud_flags::created_at.asc())
            .load(&mut conn)
            .await?;
        Ok(records.into_iter().map(Self::record_to_flag).collect())
    }
}
