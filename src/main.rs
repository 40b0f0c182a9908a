mod config;
mod data;
mod enrich;
mod error;
mod ingest;
mod storage;

use chrono::Utc;
use config::Config;
use data::MarketDataClient;
use dotenv::dotenv;
use enrich::EnrichmentEngine;
use ingest::{duration_until_next, IngestionScheduler, SymbolIngestor};
use std::sync::Arc;
use storage::{LocalObjectStore, ObjectStore};
use tracing::{error, info};

/// Runs one full pipeline pass: an ingestion run across every configured
/// symbol, then a wholesale rebuild of the enriched table from whatever
/// raw blobs now exist in storage.
///
/// Per-symbol failures in either half are reported through their outcome
/// values and warnings; a failed enrichment run is logged and the process
/// keeps waiting for the next trigger. Nothing here aborts the loop.
async fn run_pipeline(
    scheduler: &IngestionScheduler,
    engine: &EnrichmentEngine,
    symbols: &[String],
) {
    let summary = scheduler.run_once().await;
    for outcome in &summary.outcomes {
        info!(
            symbol = %outcome.symbol,
            status = ?outcome.status,
            bars = outcome.bar_count,
            detail = %outcome.detail,
            "symbol outcome"
        );
    }

    match engine.enrich(symbols).await {
        Ok(report) => info!(
            rows = report.table.len(),
            skipped = report.skipped.len(),
            "enrichment finished"
        ),
        Err(err) => error!(error = %err, "enrichment run failed"),
    }
}

/// Entry point for the market-data pipeline.
///
/// Wires the long-lived handles together from configuration and then acts
/// as the recurring trigger: sleep until the configured daily run time,
/// run the pipeline, repeat. `--once` runs a single pass and exits, for
/// manual invocations. One process means one run at a time, which is the
/// serialization the components assume.
///
/// # Workflow Steps
/// - Initialize structured logging and load `.env`
/// - Build the configuration and the storage, client, scheduler, and
///   enrichment handles (a storage handle failure here is fatal; nothing
///   downstream can succeed without it)
/// - Optionally run immediately at startup
/// - Loop: sleep until the next scheduled time, then run
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;
    let run_once = std::env::args().any(|arg| arg == "--once");

    let store = Arc::new(LocalObjectStore::open(&config.storage_root, &config.container).await?);
    let existing = store.list("").await?;
    info!(objects = existing.len(), "storage container opened");

    let client = Arc::new(MarketDataClient::new(&config)?);
    let ingestor = SymbolIngestor::new(client, store.clone());
    let scheduler = IngestionScheduler::new(ingestor, config.symbols.clone());
    let engine = EnrichmentEngine::new(store);

    info!(
        symbols = config.symbols.len(),
        container = %config.container,
        run_at = %config.run_at,
        "pipeline configured"
    );

    if run_once {
        run_pipeline(&scheduler, &engine, &config.symbols).await;
        return Ok(());
    }

    if config.run_on_startup {
        run_pipeline(&scheduler, &engine, &config.symbols).await;
    }

    loop {
        let wait = duration_until_next(Utc::now(), config.run_at);
        info!(
            run_at = %config.run_at,
            sleep_secs = wait.as_secs(),
            "waiting for next scheduled run"
        );
        tokio::time::sleep(wait).await;
        run_pipeline(&scheduler, &engine, &config.symbols).await;
    }
}
