//! Initialize command.

use chrono::Utc;
use console::style;
use uuid::Uuid;

use crate::config::Settings;
use crate::models::{
    Afe, FraudFlagSpec, Policy, PolicyActions, PolicyCondition, PolicyType, Vendor, Well,
};

/// Initialize the data directory and database, optionally seeding demo data.
pub async fn cmd_init(settings: &Settings, seed: bool) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context();
    ctx.init_schema().await?;
    println!(
        "{} Database ready at {}",
        style("✓").green(),
        settings.database_path().display()
    );

    if seed {
        seed_demo_data(settings).await?;
    }

    Ok(())
}

/// Seed one AFE near its ceiling, a well, two vendors sharing a bank
/// account, and a small policy set exercising every action kind.
async fn seed_demo_data(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings.create_db_context();
    let org = settings.default_org_id.clone();
    let now = Utc::now();

    let afes = ctx.afes();
    let mut afe = Afe::new(
        Uuid::new_v4().to_string(),
        org.clone(),
        "AFE-2024-0117".to_string(),
        100_000.0,
    );
    afe.description = Some("Drilling - Permian pad 7".to_string());
    afe.spent_amount = 82_500.0;
    afes.create(&afe).await?;
    println!("  {} Seeded AFE {}", style("✓").green(), afe.afe_number);

    let well = Well::new(
        Uuid::new_v4().to_string(),
        org.clone(),
        "42-165-41077".to_string(),
        "Permian 7H".to_string(),
    );
    afes.create_well(&well).await?;
    println!("  {} Seeded well {}", style("✓").green(), well.uwi);

    let vendors = ctx.vendors();
    for (name, account) in [
        ("Acme Oilfield Services", "ACCT-4471"),
        ("Basin Pressure Pumping", "ACCT-4471"),
    ] {
        vendors
            .create(&Vendor::new(
                Uuid::new_v4().to_string(),
                org.clone(),
                name.to_string(),
                Some(account.to_string()),
            ))
            .await?;
        println!("  {} Seeded vendor {}", style("✓").green(), name);
    }

    let policies = ctx.policies();
    let seeded = [
        Policy {
            id: Uuid::new_v4().to_string(),
            org_id: org.clone(),
            name: "Two approvals above $5,000".to_string(),
            policy_type: PolicyType::Approval,
            conditions: PolicyCondition::AmountThreshold { threshold: 5_000.0 },
            actions: PolicyActions {
                require_approvals: Some(2),
                ..Default::default()
            },
            priority: 10,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
        Policy {
            id: Uuid::new_v4().to_string(),
            org_id: org.clone(),
            name: "Duplicate payee instrument".to_string(),
            policy_type: PolicyType::Fraud,
            conditions: PolicyCondition::DuplicateBankAccount,
            actions: PolicyActions {
                flag_for_review: true,
                create_fraud_flag: Some(FraudFlagSpec {
                    flag_type: "duplicate_bank_account".to_string(),
                    risk_score: 0.85,
                }),
                ..Default::default()
            },
            priority: 5,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    ];
    for policy in &seeded {
        policies.create(policy).await?;
        println!("  {} Seeded policy '{}'", style("✓").green(), policy.name);
    }

    println!("{} Seed data loaded for org '{}'", style("✓").green(), org);
    Ok(())
}
