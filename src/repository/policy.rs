//! Policy repository.
//!
//! Policies are read-only to this core; `create` exists for seeding and
//! tests. Conditions and actions are stored as JSON text and decoded into
//! the closed variant types; a condition this build does not recognize
//! decodes to `Unknown` and never triggers.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{NewPolicy, PolicyRecord};
use crate::models::{Policy, PolicyActions, PolicyCondition, PolicyType};
use crate::schema::policies;

/// Diesel-based policy repository.
#[derive(Clone)]
pub struct PolicyRepository {
    pool: AsyncSqlitePool,
}

impl PolicyRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    fn record_to_policy(record: PolicyRecord) -> Option<Policy> {
        let policy_type = match PolicyType::from_str(&record.policy_type) {
            Some(t) => t,
            None => {
                warn!("Skipping policy {} with unknown type {}", record.id, record.policy_type);
                return None;
            }
        };
        let conditions: PolicyCondition =
            serde_json::from_str(&record.conditions).unwrap_or_else(|e| {
                warn!("Policy {} has undecodable conditions: {}", record.id, e);
                PolicyCondition::Unknown
            });
        let actions: PolicyActions = serde_json::from_str(&record.actions).unwrap_or_else(|e| {
            warn!("Policy {} has undecodable actions: {}", record.id, e);
            PolicyActions::default()
        });

        Some(Policy {
            policy_type,
            conditions,
            actions,
            priority: record.priority,
            is_active: record.is_active != 0,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
            id: record.id,
            org_id: record.org_id,
            name: record.name,
        })
    }

    /// Save a new policy (seeding and tests).
    pub async fn create(&self, policy: &Policy) -> Result<(), DieselError> {
        let conditions = serde_json::to_string(&policy.conditions)
            .map_err(super::pool::to_diesel_error)?;
        let actions =
            serde_json::to_string(&policy.actions).map_err(super::pool::to_diesel_error)?;
        let created_at = policy.created_at.to_rfc3339();
        let updated_at = policy.updated_at.to_rfc3339();

        let new_policy = NewPolicy {
            id: &policy.id,
            org_id: &policy.org_id,
            name: &policy.name,
            policy_type: policy.policy_type.as_str(),
            conditions: &conditions,
            actions: &actions,
            priority: policy.priority,
            is_active: policy.is_active as i32,
            created_at: &created_at,
            updated_at: &updated_at,
        };

        let mut conn = self.pool.get().await?;
        diesel::insert_into(policies::table)
            .values(&new_policy)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    /// Load active policies of the requested types for an organization,
    /// ordered ascending by priority (lower evaluates earlier).
    pub async fn load_active(
        &self,
        org_id: &str,
        types: &[PolicyType],
    ) -> Result<Vec<Policy>, DieselError> {
        let type_names: Vec<&str> = types.iter().map(|t| t.as_str()).collect();

        let mut conn = self.pool.get().await?;
        let records: Vec<PolicyRecord> = policies::table
            .filter(policies::org_id.eq(org_id))
            .filter(policies::is_active.eq(1))
            .filter(policies::policy_type.eq_any(&type_names))
            .order(policies::priority.asc())
            .load(&mut conn)
            .await?;

        Ok(records
            .into_iter()
            .filter_map(Self::record_to_policy)
            .collect())
    }

    /// Deactivate a policy. Used by seed/reset tooling only.
    pub async fn deactivate(&self, id: &str) -> Result<(), DieselError> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.pool.get().await?;
        diesel::update(policies::table.find(id))
            .set((policies::is_active.eq(0), policies::updated_at.eq(&now)))
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FraudFlagSpec;
    use crate::repository::DbContext;
    use tempfile::tempdir;

    fn policy(id: &str, priority: i32, policy_type: PolicyType) -> Policy {
        let now = Utc::now();
        Policy {
            id: id.to_string(),
            org_id: "org-1".to_string(),
            name: format!("policy {}", id),
            policy_type,
            conditions: PolicyCondition::AmountThreshold { threshold: 5000.0 },
            actions: PolicyActions {
                require_approvals: Some(2),
                create_fraud_flag: Some(FraudFlagSpec {
                    flag_type: "test".to_string(),
                    risk_score: 0.4,
                }),
                ..Default::default()
            },
            priority,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_load_active_orders_by_priority() {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.policies();

        repo.create(&policy("p-low", 50, PolicyType::Approval))
            .await
            .unwrap();
        repo.create(&policy("p-first", 1, PolicyType::Approval))
            .await
            .unwrap();
        repo.create(&policy("p-fraud", 10, PolicyType::Fraud))
            .await
            .unwrap();

        let loaded = repo
            .load_active("org-1", &[PolicyType::Approval, PolicyType::Fraud])
            .await
            .unwrap();
        let ids: Vec<&str> = loaded.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-first", "p-fraud", "p-low"]);

        // Round trip preserves typed conditions and actions
        assert_eq!(
            loaded[0].conditions,
            PolicyCondition::AmountThreshold { threshold: 5000.0 }
        );
        assert_eq!(loaded[0].actions.require_approvals, Some(2));

        // Type filter
        let only_fraud = repo.load_active("org-1", &[PolicyType::Fraud]).await.unwrap();
        assert_eq!(only_fraud.len(), 1);

        // Deactivation removes from load
        repo.deactivate("p-first").await.unwrap();
        let loaded = repo
            .load_active("org-1", &[PolicyType::Approval])
            .await
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "p-low");
    }
}
