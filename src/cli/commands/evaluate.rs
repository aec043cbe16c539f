//! Evaluate command.

use console::style;

use crate::config::Settings;
use crate::services::{InvoiceFacts, PolicyEngine};

/// Evaluate routing policies against an invoice.
pub async fn cmd_evaluate(
    settings: &Settings,
    invoice_id: &str,
    amount: f64,
    vendor_id: Option<String>,
    confidence: Option<f64>,
) -> anyhow::Result<()> {
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;
    let actor = settings.cli_actor();

    if ctx
        .invoices()
        .get_scoped(invoice_id, &actor.org_id)
        .await?
        .is_none()
    {
        anyhow::bail!("invoice {} not found", invoice_id);
    }

    let engine = PolicyEngine::new(ctx.policies(), ctx.vendors(), ctx.routing());
    let facts = InvoiceFacts {
        amount,
        vendor_id,
        confidence_score: confidence,
    };

    let report = engine.evaluate(&actor, invoice_id, &facts, None).await?;

    for eval in &report.evaluations {
        let marker = if eval.triggered {
            style("▲").yellow()
        } else {
            style("·").dim()
        };
        println!("  {} {}: {}", marker, eval.policy_name, eval.detail);
    }
    println!(
        "{} Decision: {} ({})",
        style("✓").green(),
        report.decision.as_str(),
        report.routing_reason
    );
    if report.required_approvals > 0 {
        println!(
            "  {} approval level(s) created",
            report.outcome.approval_ids.len()
        );
    }

    Ok(())
}
