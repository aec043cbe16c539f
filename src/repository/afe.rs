//! Budget ledger accessor: AFE records and the well-identifier registry.
//!
//! All writes to `spent_amount` go through the atomic SQL updates in this
//! module; callers never read-then-write the ledger in Rust, so concurrent
//! posts against the same AFE serialize in the database.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{AfeRecord, NewAfe, NewWell, WellRecord};
use super::parse_datetime;
use crate::models::{Afe, AfeStatus, BudgetReservation, Well};
use crate::schema::{afes, wells};

/// Diesel-based AFE ledger repository.
#[derive(Clone)]
pub struct AfeRepository {
    pool: AsyncSqlitePool,
}

impl AfeRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    fn record_to_afe(record: AfeRecord) -> Afe {
        Afe {
            status: AfeStatus::from_str(&record.status).unwrap_or(AfeStatus::Active),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
            id: record.id,
            org_id: record.org_id,
            afe_number: record.afe_number,
            description: record.description,
            budget_amount: record.budget_amount,
            spent_amount: record.spent_amount,
        }
    }

    /// Save a new AFE.
    pub async fn create(&self, afe: &Afe) -> Result<(), DieselError> {
        let created_at = afe.created_at.to_rfc3339();
        let updated_at = afe.updated_at.to_rfc3339();
        let new_afe = NewAfe {
            id: &afe.id,
            org_id: &afe.org_id,
            afe_number: &afe.afe_number,
            description: afe.description.as_deref(),
            budget_amount: afe.budget_amount,
            spent_amount: afe.spent_amount,
            status: afe.status.as_str(),
            created_at: &created_at,
            updated_at: &updated_at,
        };

        let mut conn = self.pool.get().await?;
        diesel::insert_into(afes::table)
            .values(&new_afe)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Get an AFE by id.
    pub async fn get(&self, id: &str) -> Result<Option<Afe>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<AfeRecord> = afes::table.find(id).first(&mut conn).await.optional()?;
        Ok(record.map(Self::record_to_afe))
    }

    /// Find the active AFE with the given number within an organization.
    pub async fn find_active_by_number(
        &self,
        org_id: &str,
        afe_number: &str,
    ) -> Result<Option<Afe>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<AfeRecord> = afes::table
            .filter(afes::org_id.eq(org_id))
            .filter(afes::afe_number.eq(afe_number))
            .filter(afes::status.eq(AfeStatus::Active.as_str()))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Self::record_to_afe))
    }

    /// Atomically reserve budget against an active AFE.
    ///
    /// Performs the read-decide-write as one conditional UPDATE: the spend
    /// is applied only when it fits inside `budget_amount`. Returns whether
    /// the reservation was applied and the remaining budget afterward.
    pub async fn try_reserve_budget(
        &self,
        afe_id: &str,
        amount: f64,
    ) -> Result<BudgetReservation, DieselError> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.pool.get().await?;

        let updated = diesel::update(
            afes::table
                .find(afe_id)
                .filter(afes::status.eq(AfeStatus::Active.as_str()))
                .filter((afes::spent_amount + amount).le(afes::budget_amount)),
        )
        .set((
            afes::spent_amount.eq(afes::spent_amount + amount),
            afes::updated_at.eq(&now),
        ))
        .execute(&mut conn)
        .await?;

        let record: AfeRecord = afes::table.find(afe_id).first(&mut conn).await?;
        Ok(BudgetReservation {
            ok: updated > 0,
            remaining: record.budget_amount - record.spent_amount,
        })
    }

    /// Unconditionally post spend to an AFE (atomic increment).
    ///
    /// Used at approval finalization: a fully approved invoice is settled
    /// business reality even when it breaches the envelope; the breach then
    /// surfaces as `over_budget` on subsequent extractions.
    pub async fn post_spend(&self, afe_id: &str, amount: f64) -> Result<f64, DieselError> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.pool.get().await?;

        diesel::update(afes::table.find(afe_id))
            .set((
                afes::spent_amount.eq(afes::spent_amount + amount),
                afes::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;

        let record: AfeRecord = afes::table.find(afe_id).first(&mut conn).await?;
        Ok(record.budget_amount - record.spent_amount)
    }

    /// Save a new well registration.
    pub async fn create_well(&self, well: &Well) -> Result<(), DieselError> {
        let created_at = well.created_at.to_rfc3339();
        let new_well = NewWell {
            id: &well.id,
            org_id: &well.org_id,
            uwi: &well.uwi,
            name: &well.name,
            created_at: &created_at,
        };

        let mut conn = self.pool.get().await?;
        diesel::insert_into(wells::table)
            .values(&new_well)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Look up a well by its unique well identifier within an organization.
    pub async fn find_well_by_uwi(
        &self,
        org_id: &str,
        uwi: &str,
    ) -> Result<Option<Well>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<WellRecord> = wells::table
            .filter(wells::org_id.eq(org_id))
            .filter(wells::uwi.eq(uwi))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(|r| Well {
            created_at: parse_datetime(&r.created_at),
            id: r.id,
            org_id: r.org_id,
            uwi: r.uwi,
            name: r.name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    async fn setup() -> (AfeRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (ctx.afes(), dir)
    }

    #[tokio::test]
    async fn test_try_reserve_budget() {
        let (repo, _dir) = setup().await;

        let mut afe = Afe::new(
            "afe-1".to_string(),
            "org-1".to_string(),
            "AFE-2024-001".to_string(),
            100_000.0,
        );
        afe.spent_amount = 95_000.0;
        repo.create(&afe).await.unwrap();

        // Fits: 95k + 3k <= 100k
        let res = repo.try_reserve_budget("afe-1", 3_000.0).await.unwrap();
        assert!(res.ok);
        assert!((res.remaining - 2_000.0).abs() < 1e-9);

        // Does not fit: 98k + 10k > 100k, ledger unchanged
        let res = repo.try_reserve_budget("afe-1", 10_000.0).await.unwrap();
        assert!(!res.ok);
        assert!((res.remaining - 2_000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_reserve_refused_on_inactive_afe() {
        let (repo, _dir) = setup().await;

        let mut afe = Afe::new(
            "afe-2".to_string(),
            "org-1".to_string(),
            "AFE-2024-002".to_string(),
            50_000.0,
        );
        afe.status = AfeStatus::Closed;
        repo.create(&afe).await.unwrap();

        let res = repo.try_reserve_budget("afe-2", 1_000.0).await.unwrap();
        assert!(!res.ok);
        assert!((res.remaining - 50_000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_post_spend_may_breach_envelope() {
        let (repo, _dir) = setup().await;

        let mut afe = Afe::new(
            "afe-3".to_string(),
            "org-1".to_string(),
            "AFE-2024-003".to_string(),
            10_000.0,
        );
        afe.spent_amount = 9_000.0;
        repo.create(&afe).await.unwrap();

        let remaining = repo.post_spend("afe-3", 2_500.0).await.unwrap();
        assert!((remaining + 1_500.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_find_active_by_number_scopes_org_and_status() {
        let (repo, _dir) = setup().await;

        let afe = Afe::new(
            "afe-4".to_string(),
            "org-1".to_string(),
            "AFE-2024-004".to_string(),
            25_000.0,
        );
        repo.create(&afe).await.unwrap();

        assert!(repo
            .find_active_by_number("org-1", "AFE-2024-004")
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .find_active_by_number("org-2", "AFE-2024-004")
            .await
            .unwrap()
            .is_none());
    }
}
