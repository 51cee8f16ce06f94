// Runs one autopayment tick against the configured store and prints the report.
// Usage: cargo run --bin run_autopayments -- [--at 2024-06-01T00:00:00Z] [--ledger-mode atomic]

use chrono::{DateTime, Utc};
use clap::Parser;
use std::sync::Arc;

use wallet_api::{open_store, AppState, Config, LedgerMode};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Treat this RFC 3339 instant as "now" when picking due autopayments
    #[arg(long)]
    at: Option<DateTime<Utc>>,

    /// Override LEDGER_MODE (sequential or atomic)
    #[arg(long)]
    ledger_mode: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_api=info".into()),
        )
        .init();

    let mut config = Config::from_env()?;
    if let Some(mode) = cli.ledger_mode.as_deref() {
        config.ledger_mode = mode.parse::<LedgerMode>()?;
    }
    let config = Arc::new(config);

    let store = open_store(&config).await?;
    let state = AppState::new(store, config);

    let now = cli.at.unwrap_or_else(Utc::now);
    let report = state.autopayments.run_tick(now).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Autopayment tick at {}", now);
        println!("  scanned:                    {}", report.scanned);
        println!("  executed:                   {}", report.executed);
        println!("  rescheduled:                {}", report.rescheduled);
        println!("  skipped (insufficient):     {}", report.skipped_insufficient_funds);
        println!("  skipped (missing owner):    {}", report.skipped_missing_owner);
        println!("  failed:                     {}", report.failed);
    }

    Ok(())
}
