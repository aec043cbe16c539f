//! CLI parser and dispatch.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "afe")]
#[command(about = "AFE invoice extraction and approval workflow")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides ./afeflow.toml discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init {
        /// Seed demo AFEs, wells, vendors, and policies
        #[arg(long)]
        seed: bool,
    },
    /// Start the API server
    Serve {
        /// Bind address: port, host, or host:port
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Extract a document against an invoice
    Extract {
        /// Invoice id (created if missing)
        invoice_id: String,
        /// Path to the invoice document
        file: PathBuf,
        /// Content-type hint (e.g. application/pdf)
        #[arg(long)]
        file_type: Option<String>,
        /// Invoice amount used when creating a missing invoice
        #[arg(long, default_value_t = 0.0)]
        amount: f64,
    },
    /// Evaluate routing policies against an invoice
    Evaluate {
        invoice_id: String,
        /// Invoice amount
        #[arg(long)]
        amount: f64,
        /// Vendor id, for fraud checks
        #[arg(long)]
        vendor_id: Option<String>,
        /// Extraction confidence score
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Show pipeline status counts
    Status,
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { seed } => commands::init::cmd_init(&settings, seed).await,
        Commands::Serve { bind } => commands::serve::cmd_serve(&settings, bind.as_deref()).await,
        Commands::Extract {
            invoice_id,
            file,
            file_type,
            amount,
        } => {
            commands::extract::cmd_extract(&settings, &invoice_id, &file, file_type.as_deref(), amount)
                .await
        }
        Commands::Evaluate {
            invoice_id,
            amount,
            vendor_id,
            confidence,
        } => {
            commands::evaluate::cmd_evaluate(&settings, &invoice_id, amount, vendor_id, confidence)
                .await
        }
        Commands::Status => commands::status::cmd_status(&settings).await,
    }
}
