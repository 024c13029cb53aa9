//! Sync Service - Pulls Google Sheets into the reporting tables
//!
//! Responsibilities:
//! - Load sync connections (active rows of `sync_connections`, or a JSON file)
//! - Read each spreadsheet through the Sheets values API
//! - Parse financial statements or daily operational tabs
//! - Replace the affected periods in the reporting tables
//! - Record a status line per connection
//!
//! Usage:
//!   # Every active connection:
//!   cargo run --bin sync
//!
//!   # From config (batch mode), parse only:
//!   cargo run --bin sync -- --config config/sources.json --dry-run
//!
//!   # One connection, every 30 minutes:
//!   cargo run --bin sync -- --source-id "Laporan Keuangan" --every 30

mod catalog_cache;
mod config;
mod orchestrator;
mod sheets;
mod store;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tokio::time::sleep;

use crate::catalog_cache::PRODUCT_CATALOG;
use crate::config::{load_sources_config, Config, SyncConnection};
use crate::orchestrator::{Orchestrator, SyncSettings, SyncSummary};
use crate::sheets::GoogleSheetsClient;
use crate::store::{PgStore, Store};

#[derive(Parser, Debug)]
#[command(name = "sync", about = "Syncs spreadsheet sources into the reporting tables")]
struct Args {
    /// Path to sources config file (instead of the sync_connections table)
    #[arg(long)]
    config: Option<String>,

    /// Only sync this connection (UUID or name)
    #[arg(long)]
    source_id: Option<String>,

    /// Dry run - parse but don't write to database
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Verify mode - re-read written periods and compare row counts
    #[arg(long, default_value = "false")]
    verify: bool,

    /// Repeat the whole run every N minutes
    #[arg(long)]
    every: Option<u64>,

    /// Reload the product catalog before each run
    #[arg(long, default_value = "false")]
    refresh_catalog: bool,
}

async fn load_connections(args: &Args, store: Option<&dyn Store>) -> Result<Vec<SyncConnection>> {
    let connections = match (&args.config, store) {
        (Some(path), _) => {
            println!("Loading sources from: {}", path);
            let sources_config = load_sources_config(path).await?;
            println!("Config version: {}", sources_config.version);
            sources_config.sources
        }
        (None, Some(store)) => store.load_connections().await?,
        (None, None) => anyhow::bail!("Must specify --config <path> or set DB_URL"),
    };

    Ok(connections
        .into_iter()
        .filter(|c| c.is_active)
        .filter(|c| args.source_id.as_deref().map_or(true, |id| c.matches(id)))
        .collect())
}

fn print_summary(summary: &SyncSummary) {
    println!("\n=== Sync Summary ===");
    println!("Synced: {}", summary.synced);
    println!("Failed: {}", summary.failed);
    for result in summary.results.iter().filter(|r| r.outcome.is_failed()) {
        println!("  ✗ {} ({}): {}", result.name, result.connection_id, result.outcome.message());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = Config::from_env()?;

    println!("=== Sheets Sync ===");
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });
    println!("Batch size: {}", config.batch_size);

    let store = match &config.db_url {
        Some(url) => Some(PgStore::connect(url).await?),
        None if args.dry_run && args.config.is_some() => None,
        None => return Err(anyhow::anyhow!("DB_URL env var missing")),
    };
    let store_ref: Option<&dyn Store> = store.as_ref().map(|s| s as &dyn Store);

    let sheets = GoogleSheetsClient::from_config(&config).context("Failed to build HTTP client")?;
    let orchestrator = Orchestrator::new(
        &sheets,
        store_ref,
        &PRODUCT_CATALOG,
        SyncSettings {
            batch_size: config.batch_size,
            dry_run: args.dry_run,
            verify: args.verify,
        },
    );

    loop {
        if args.refresh_catalog {
            PRODUCT_CATALOG.invalidate().await;
        }

        let connections = load_connections(&args, store_ref).await?;
        if connections.is_empty() {
            println!("No active connections match the filter criteria");
        } else {
            println!("\nProcessing {} source(s)...", connections.len());
            let summary = orchestrator.run_batch(&connections).await;
            print_summary(&summary);
        }

        match args.every {
            Some(minutes) => {
                println!("\nNext run in {} minute(s)", minutes);
                sleep(Duration::from_secs(minutes.max(1) * 60)).await;
            }
            None => break,
        }
    }

    Ok(())
}
