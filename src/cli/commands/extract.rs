//! Extract command.

use std::path::Path;

use console::style;

use crate::config::Settings;
use crate::llm::ExtractionClient;
use crate::models::Invoice;
use crate::services::ExtractionService;

/// Run one extraction attempt against a local document file.
pub async fn cmd_extract(
    settings: &Settings,
    invoice_id: &str,
    file: &Path,
    file_type: Option<&str>,
    amount: f64,
) -> anyhow::Result<()> {
    let content = std::fs::read(file)?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let actor = settings.cli_actor();
    let invoices = ctx.invoices();

    if invoices.get_scoped(invoice_id, &actor.org_id).await?.is_none() {
        let invoice = Invoice::new(
            invoice_id.to_string(),
            actor.org_id.clone(),
            amount,
            "USD".to_string(),
        );
        invoices.create(&invoice).await?;
        println!("  {} Created invoice {}", style("✓").green(), invoice_id);
    }

    let client = ExtractionClient::new(settings.extraction.clone());
    if !client.is_available().await {
        println!(
            "{} Extraction backend at {} is not reachable",
            style("!").yellow(),
            settings.extraction.endpoint
        );
    }

    let service = ExtractionService::new(client, ctx.invoices(), ctx.extractions(), ctx.afes());
    let outcome = service
        .extract(&actor, invoice_id, &content, file_type)
        .await?;

    println!(
        "{} Extraction {}: invoice {} → {}",
        style("✓").green(),
        outcome.extraction_id,
        invoice_id,
        outcome.invoice_status.as_str()
    );
    println!(
        "  Budget: {}{}",
        outcome.budget_status.as_str(),
        outcome
            .budget_remaining
            .map(|r| format!(" (remaining ${:.2})", r))
            .unwrap_or_default()
    );
    for error in &outcome.validation_errors {
        println!("  {} {}", style("✗").red(), error);
    }
    for warning in &outcome.validation_warnings {
        println!("  {} {}", style("!").yellow(), warning);
    }

    Ok(())
}
