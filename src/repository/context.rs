//! Database context: pool construction, schema initialization, and
//! repository accessors.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::afe::AfeRepository;
use super::approval::ApprovalRepository;
use super::audit::AuditRepository;
use super::extraction::ExtractionRepository;
use super::invoice::InvoiceRepository;
use super::policy::PolicyRepository;
use super::review::ReviewRepository;
use super::routing::RoutingRepository;
use super::vendor::VendorRepository;
use super::pool::{AsyncSqlitePool, DieselError};

/// Shared handle to the backing store.
#[derive(Clone)]
pub struct DbContext {
    pool: AsyncSqlitePool,
}

impl DbContext {
    /// Create a context from a SQLite file path.
    pub fn from_sqlite_path(path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(path),
        }
    }

    /// Create a context from a database URL.
    pub fn from_url(url: &str) -> Self {
        Self {
            pool: AsyncSqlitePool::new(url),
        }
    }

    /// Initialize the schema. Idempotent.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(
            r#"
            -- Invoices table
            CREATE TABLE IF NOT EXISTS invoices (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                vendor_id TEXT,
                vendor_name TEXT,
                invoice_number TEXT,
                amount DOUBLE NOT NULL DEFAULT 0,
                currency TEXT NOT NULL DEFAULT 'USD',
                invoice_date TEXT,
                due_date TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                confidence_score DOUBLE,
                extracted_payload TEXT,
                duplicate_hash TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_invoices_org ON invoices(org_id);
            CREATE INDEX IF NOT EXISTS idx_invoices_status ON invoices(status);
            CREATE INDEX IF NOT EXISTS idx_invoices_duplicate_hash ON invoices(duplicate_hash)
                WHERE duplicate_hash IS NOT NULL;

            -- Extraction attempts, one row per attempt
            CREATE TABLE IF NOT EXISTS invoice_extractions (
                id TEXT PRIMARY KEY,
                invoice_id TEXT NOT NULL,
                extraction_status TEXT NOT NULL DEFAULT 'processing',
                afe_number TEXT,
                afe_id TEXT,
                well_identifier TEXT,
                well_id TEXT,
                field_ticket_numbers TEXT NOT NULL DEFAULT '[]',
                po_number TEXT,
                service_period_start TEXT,
                service_period_end TEXT,
                line_items TEXT NOT NULL DEFAULT '[]',
                confidence_scores TEXT NOT NULL DEFAULT '{}',
                raw_response TEXT,
                budget_status TEXT NOT NULL DEFAULT 'no_afe',
                budget_remaining DOUBLE,
                validation_errors TEXT NOT NULL DEFAULT '[]',
                validation_warnings TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_extractions_invoice ON invoice_extractions(invoice_id);

            -- AFE budget ledger
            CREATE TABLE IF NOT EXISTS afes (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                afe_number TEXT NOT NULL,
                description TEXT,
                budget_amount DOUBLE NOT NULL DEFAULT 0,
                spent_amount DOUBLE NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_afes_org_number ON afes(org_id, afe_number);

            -- Well identifier registry
            CREATE TABLE IF NOT EXISTS wells (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                uwi TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_wells_org_uwi ON wells(org_id, uwi);

            -- Vendor registry
            CREATE TABLE IF NOT EXISTS vendors (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                name TEXT NOT NULL,
                bank_account TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_vendors_org ON vendors(org_id);

            -- Routing policies
            CREATE TABLE IF NOT EXISTS policies (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                name TEXT NOT NULL,
                policy_type TEXT NOT NULL,
                conditions TEXT NOT NULL DEFAULT '{}',
                actions TEXT NOT NULL DEFAULT '{}',
                priority INTEGER NOT NULL DEFAULT 100,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_policies_org_type ON policies(org_id, policy_type);

            -- Approval levels
            CREATE TABLE IF NOT EXISTS approvals (
                id TEXT PRIMARY KEY,
                invoice_id TEXT NOT NULL,
                approval_level INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                approver_id TEXT,
                amount_approved DOUBLE,
                approval_date TEXT,
                comments TEXT,
                auto_approved INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_approvals_invoice ON approvals(invoice_id);

            -- Human review queue
            CREATE TABLE IF NOT EXISTS review_queue (
                id TEXT PRIMARY KEY,
                invoice_id TEXT NOT NULL,
                reason TEXT NOT NULL,
                priority TEXT NOT NULL DEFAULT 'normal',
                confidence_score DOUBLE,
                flagged_fields TEXT NOT NULL DEFAULT '[]',
                assigned_to TEXT,
                resolved_at TEXT,
                resolution TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_review_queue_invoice ON review_queue(invoice_id);

            -- Fraud flags
            CREATE TABLE IF NOT EXISTS fraud_flags (
                id TEXT PRIMARY KEY,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                flag_type TEXT NOT NULL,
                risk_score DOUBLE NOT NULL DEFAULT 0,
                details TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'open',
                resolved_at TEXT,
                resolution TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_fraud_flags_entity ON fraud_flags(entity_type, entity_id);

            -- Append-only audit log
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                actor_id TEXT,
                old_values TEXT,
                new_values TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_audit_log_entity ON audit_log(entity_type, entity_id);
            "#,
        )
        .await
    }

    /// List user tables, for diagnostics.
    pub async fn list_tables(&self) -> Result<Vec<String>, DieselError> {
        use diesel_async::RunQueryDsl;

        #[derive(diesel::QueryableByName)]
        struct TableRow {
            #[diesel(sql_type = diesel::sql_types::Text)]
            name: String,
        }

        let mut conn = self.pool.get().await?;
        let rows: Vec<TableRow> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .load(&mut conn)
        .await?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    pub fn extractions(&self) -> ExtractionRepository {
        ExtractionRepository::new(self.pool.clone())
    }

    pub fn afes(&self) -> AfeRepository {
        AfeRepository::new(self.pool.clone())
    }

    pub fn vendors(&self) -> VendorRepository {
        VendorRepository::new(self.pool.clone())
    }

    pub fn policies(&self) -> PolicyRepository {
        PolicyRepository::new(self.pool.clone())
    }

    pub fn approvals(&self) -> ApprovalRepository {
        ApprovalRepository::new(self.pool.clone())
    }

    pub fn routing(&self) -> RoutingRepository {
        RoutingRepository::new(self.pool.clone())
    }

    pub fn reviews(&self) -> ReviewRepository {
        ReviewRepository::new(self.pool.clone())
    }

    pub fn audit(&self) -> AuditRepository {
        AuditRepository::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_schema_creates_tables() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        // Idempotent
        ctx.init_schema().await.unwrap();

        let tables = ctx.list_tables().await.unwrap();
        for table in [
            "invoices",
            "invoice_extractions",
            "afes",
            "wells",
            "vendors",
            "policies",
            "approvals",
            "review_queue",
            "fraud_flags",
            "audit_log",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }
}
