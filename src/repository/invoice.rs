//! Invoice repository.

use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{InvoiceRecord, NewInvoice};
use super::parse_datetime_opt;
use crate::models::{Invoice, InvoiceStatus};
use crate::schema::invoices;

/// Diesel-based invoice repository.
#[derive(Clone)]
pub struct InvoiceRepository {
    pool: AsyncSqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Convert a database record to the domain model.
    pub(crate) fn record_to_invoice(record: InvoiceRecord) -> Invoice {
        Invoice {
            status: InvoiceStatus::from_str(&record.status).unwrap_or(InvoiceStatus::Pending),
            invoice_date: parse_datetime_opt(record.invoice_date),
            due_date: parse_datetime_opt(record.due_date),
            created_at: super::parse_datetime(&record.created_at),
            updated_at: super::parse_datetime(&record.updated_at),
            id: record.id,
            org_id: record.org_id,
            vendor_id: record.vendor_id,
            vendor_name: record.vendor_name,
            invoice_number: record.invoice_number,
            amount: record.amount,
            currency: record.currency,
            confidence_score: record.confidence_score,
            extracted_payload: record.extracted_payload,
            duplicate_hash: record.duplicate_hash,
        }
    }

    /// Save a new invoice.
    pub async fn create(&self, invoice: &Invoice) -> Result<(), DieselError> {
        let created_at = invoice.created_at.to_rfc3339();
        let updated_at = invoice.updated_at.to_rfc3339();
        let invoice_date = invoice.invoice_date.map(|d| d.to_rfc3339());
        let due_date = invoice.due_date.map(|d| d.to_rfc3339());

        let new_invoice = NewInvoice {
            id: &invoice.id,
            org_id: &invoice.org_id,
            vendor_id: invoice.vendor_id.as_deref(),
            vendor_name: invoice.vendor_name.as_deref(),
            invoice_number: invoice.invoice_number.as_deref(),
            amount: invoice.amount,
            currency: &invoice.currency,
            invoice_date: invoice_date.as_deref(),
            due_date: due_date.as_deref(),
            status: invoice.status.as_str(),
            confidence_score: invoice.confidence_score,
            extracted_payload: invoice.extracted_payload.as_deref(),
            duplicate_hash: invoice.duplicate_hash.as_deref(),
            created_at: &created_at,
            updated_at: &updated_at,
        };

        let mut conn = self.pool.get().await?;
        diesel::insert_into(invoices::table)
            .values(&new_invoice)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Get an invoice by id.
    pub async fn get(&self, id: &str) -> Result<Option<Invoice>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<InvoiceRecord> = invoices::table
            .find(id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Self::record_to_invoice))
    }

    /// Get an invoice by id, scoped to an organization.
    pub async fn get_scoped(&self, id: &str, org_id: &str) -> Result<Option<Invoice>, DieselError> {
        let mut conn = self.pool.get().await?;
        let record: Option<InvoiceRecord> = invoices::table
            .find(id)
            .filter(invoices::org_id.eq(org_id))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(record.map(Self::record_to_invoice))
    }

    /// Update an invoice's status.
    pub async fn update_status(&self, id: &str, status: InvoiceStatus) -> Result<(), DieselError> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.pool.get().await?;
        diesel::update(invoices::table.find(id))
            .set((
                invoices::status.eq(status.as_str()),
                invoices::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Find another invoice in the same org carrying the given duplicate
    /// hash, excluding the invoice being processed.
    pub async fn find_duplicate(
        &self,
        org_id: &str,
        duplicate_hash: &str,
        exclude_id: &str,
    ) -> Result<Option<String>, DieselError> {
        let mut conn = self.pool.get().await?;
        invoices::table
            .filter(invoices::org_id.eq(org_id))
            .filter(invoices::duplicate_hash.eq(duplicate_hash))
            .filter(invoices::id.ne(exclude_id))
            .select(invoices::id)
            .first(&mut conn)
            .await
            .optional()
    }

    /// Count invoices by status, for status reporting.
    pub async fn count_by_status(&self) -> Result<HashMap<String, u64>, DieselError> {
        use diesel::dsl::count_star;
        let mut conn = self.pool.get().await?;
        let rows: Vec<(String, i64)> = invoices::table
            .group_by(invoices::status)
            .select((invoices::status, count_star()))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(|(s, c)| (s, c as u64)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_get_update() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.invoices();

        let invoice = Invoice::new(
            "inv-1".to_string(),
            "org-1".to_string(),
            2500.0,
            "USD".to_string(),
        );
        repo.create(&invoice).await.unwrap();

        let loaded = repo.get("inv-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, InvoiceStatus::Pending);
        assert_eq!(loaded.amount, 2500.0);

        repo.update_status("inv-1", InvoiceStatus::Validated)
            .await
            .unwrap();
        let loaded = repo.get("inv-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, InvoiceStatus::Validated);

        // Org scoping
        assert!(repo.get_scoped("inv-1", "org-2").await.unwrap().is_none());
        assert!(repo.get_scoped("inv-1", "org-1").await.unwrap().is_some());
    }
}
