//! Credit ledger server binary
//!
//! Opens the ledger and waits for shutdown. Wire transport is supplied by
//! an external shell; this process owns the ledger lifecycle only.

use green_ledger::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Green Ledger server");

    // Load configuration
    let config = Config::from_env()?;

    // Open ledger
    let ledger = Ledger::open(config).await?;
    let health = ledger.health();
    tracing::info!(status = %health.status, "Ledger opened successfully");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down ledger server");
    ledger.shutdown().await?;
    Ok(())
}
