//! Status command.

use console::style;

use crate::config::Settings;

/// Show pipeline status counts.
pub async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    let counts = ctx.invoices().count_by_status().await?;
    println!("{} Invoices by status:", style("→").cyan());
    if counts.is_empty() {
        println!("  (none)");
    }
    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort();
    for (status, count) in sorted {
        println!("  {:<20} {}", status, count);
    }

    let open_reviews = ctx.reviews().list_open().await?;
    println!(
        "{} Review queue: {} open entr{}",
        style("→").cyan(),
        open_reviews.len(),
        if open_reviews.len() == 1 { "y" } else { "ies" }
    );

    Ok(())
}
