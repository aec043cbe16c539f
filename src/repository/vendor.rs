//! Vendor registry repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{NewVendor, VendorRecord};
use crate::models::Vendor;
use crate::schema::vendors;

/// Diesel-based vendor repository.
#[derive(Clone)]
pub struct VendorRepository {
    pool: AsyncSqlitePool,
}

impl VendorRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    fn record_to_vendor(record: VendorRecord) -> Vendor {
        Vendor {
            created_at: parse_datetime(&record.created_at),
            id: record.id,
            org_id: record.org_id,
            name: record.name,
            bank_account: record.bank_account,
        }
    }

    /// Save a new vendor.
    pub async fn create(&self, vendor: &Vendor) -> Result<(), DieselError> {
        let created_at = vendor.created_at.to_rfc3339();
        let new_vendor = NewVendor {
            id: &vendor.id,
            org_id: &vendor.org_id,
            name: &vendor.name,
            bank_account: vendor.bank_account.as_deref(),
            created_at: &created_at,
        };

        let mut conn = self.pool.get().await?;
        diesel::insert_into(vendors::table)
            .values(&new_vendor)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Get a vendor by id, scoped to an organization.
    pub async fn get_scoped(&self, id: &str, org_id: &str) -> Result<Option<Vendor>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<VendorRecord> = vendors::table
            .find(id)
            .filter(vendors::org_id.eq(org_id))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Self::record_to_vendor))
    }

    /// Find other vendors in the org sharing a bank-account identifier
    /// (exact match, the owning vendor excluded).
    pub async fn find_sharing_bank_account(
        &self,
        org_id: &str,
        bank_account: &str,
        exclude_vendor_id: &str,
    ) -> Result<Vec<Vendor>, DieselError> {
        let mut conn = self.pool.get().await?;
        let records: Vec<VendorRecord> = vendors::table
            .filter(vendors::org_id.eq(org_id))
            .filter(vendors::bank_account.eq(bank_account))
            .filter(vendors::id.ne(exclude_vendor_id))
            .load(&mut conn)
            .await?;
        Ok(records.into_iter().map(Self::record_to_vendor).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_shared_bank_account_lookup() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.vendors();

        for (id, name, account) in [
            ("v-1", "Acme Oilfield", Some("ACCT-111")),
            ("v-2", "Basin Services", Some("ACCT-111")),
            ("v-3", "Delta Wireline", Some("ACCT-222")),
            ("v-4", "No Account Co", None),
        ] {
            repo.create(&Vendor::new(
                id.to_string(),
                "org-1".to_string(),
                name.to_string(),
                account.map(String::from),
            ))
            .await
            .unwrap();
        }

        let shared = repo
            .find_sharing_bank_account("org-1", "ACCT-111", "v-1")
            .await
            .unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, "v-2");

        let shared = repo
            .find_sharing_bank_account("org-1", "ACCT-222", "v-3")
            .await
            .unwrap();
        assert!(shared.is_empty());
    }
}
