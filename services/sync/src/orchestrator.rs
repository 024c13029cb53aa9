//! Runs every configured source once: parse, replace the affected periods,
//! record a status line.
//!
//! Financial tables are replaced month by month. Operational tables are
//! replaced for the detected period, and rows that spill past it (a December
//! sheet starting on 30 November) replace only their exact dates.
//!
//! Sources run one after another. Writes for one source are not wrapped in a
//! transaction, so a failure halfway leaves the tables written so far in
//! their new state; the status line says the source failed.

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use chrono::NaiveDate;
use sheets_parser::{
    parse_financial_report, parse_operational_sheet, CanonicalMonth, OperationalSheets,
    SheetSource,
};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::catalog_cache::CatalogCache;
use crate::config::{SourceKind, SyncConnection};
use crate::store::{Store, Table};

const MONTHLY_SUMMARY_KEYS: &[&str] = &["period", "product"];

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Success { rows: usize },
    PartialWarning { rows: usize, warnings: Vec<String> },
    Failed { message: String },
}

impl SyncOutcome {
    /// Value stored in `sync_connections.last_status`.
    pub fn status(&self) -> &'static str {
        match self {
            SyncOutcome::Success { .. } | SyncOutcome::PartialWarning { .. } => "success",
            SyncOutcome::Failed { .. } => "error",
        }
    }

    pub fn message(&self) -> String {
        match self {
            SyncOutcome::Success { rows } => format!("{} rows synced", rows),
            SyncOutcome::PartialWarning { rows, warnings } => {
                format!("{} rows synced with warnings: {}", rows, warnings.join("; "))
            }
            SyncOutcome::Failed { message } => message.clone(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct SourceResult {
    pub connection_id: Uuid,
    pub name: String,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub synced: usize,
    pub failed: usize,
    pub results: Vec<SourceResult>,
}

#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub batch_size: usize,
    pub dry_run: bool,
    pub verify: bool,
}

/// Inclusive date span that is deleted and re-inserted as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Window {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl From<CanonicalMonth> for Window {
    fn from(month: CanonicalMonth) -> Self {
        Window {
            from: month.first_day(),
            to: month.last_day(),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}..{}", self.from, self.to)
        }
    }
}

pub struct Orchestrator<'a> {
    sheets: &'a dyn SheetSource,
    store: Option<&'a dyn Store>,
    catalog: &'a CatalogCache,
    settings: SyncSettings,
}

fn to_values<T: Serialize>(rows: &[T]) -> Result<Vec<Value>> {
    rows.iter()
        .map(|r| serde_json::to_value(r).context("Failed to serialise row"))
        .collect()
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        sheets: &'a dyn SheetSource,
        store: Option<&'a dyn Store>,
        catalog: &'a CatalogCache,
        settings: SyncSettings,
    ) -> Self {
        Self {
            sheets,
            store,
            catalog,
            settings,
        }
    }

    /// Store to write through, or `None` on dry runs.
    fn writer(&self) -> Result<Option<&'a dyn Store>> {
        if self.settings.dry_run {
            return Ok(None);
        }
        self.store
            .map(Some)
            .context("No database configured; use --dry-run or set DB_URL")
    }

    pub async fn run_batch(&self, connections: &[SyncConnection]) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for conn in connections {
            let result = self.sync_source(conn).await;
            if result.outcome.is_failed() {
                summary.failed += 1;
            } else {
                summary.synced += 1;
            }
            summary.results.push(result);
        }
        summary
    }

    pub async fn sync_source(&self, conn: &SyncConnection) -> SourceResult {
        println!("\n[{}] {} ({})", conn.kind, conn.name, conn.spreadsheet_id);

        let outcome = match conn.kind {
            SourceKind::Financial => self.sync_financial(conn).await,
            SourceKind::Operational => self.sync_operational(conn).await,
        }
        .unwrap_or_else(|e| SyncOutcome::Failed {
            message: format!("{:#}", e),
        });

        match &outcome {
            SyncOutcome::Success { rows } => println!("  ✓ Synced {} rows", rows),
            SyncOutcome::PartialWarning { rows, warnings } => {
                println!("  ⚠ Synced {} rows, {} warning(s)", rows, warnings.len());
                for w in warnings {
                    println!("      - {}", w);
                }
            }
            SyncOutcome::Failed { message } => eprintln!("  ✗ Failed: {}", message),
        }

        self.record_status(conn, &outcome).await;

        SourceResult {
            connection_id: conn.id,
            name: conn.name.clone(),
            outcome,
        }
    }

    async fn record_status(&self, conn: &SyncConnection, outcome: &SyncOutcome) {
        let Ok(Some(store)) = self.writer() else {
            return;
        };
        if let Err(e) = store
            .record_status(conn.id, outcome.status(), &outcome.message())
            .await
        {
            error!("Failed to record status for '{}': {:#}", conn.name, e);
        }
    }

    async fn sync_financial(&self, conn: &SyncConnection) -> Result<SyncOutcome> {
        let sheets = conn.options.sheets.clone().unwrap_or_default();
        let report = parse_financial_report(self.sheets, &conn.spreadsheet_id, &sheets).await;

        if report.row_count() == 0 && !report.errors.is_empty() {
            return Ok(SyncOutcome::Failed {
                message: report.errors.join("; "),
            });
        }

        // a statement that failed has no rows, so its table is left alone
        let mut rows = 0;
        rows += self
            .replace(Table::ProfitLoss, &report.pl, month_windows(&report.pl, |r| r.month))
            .await?;
        rows += self
            .replace(Table::CashFlow, &report.cf, month_windows(&report.cf, |r| r.month))
            .await?;
        rows += self
            .replace(Table::Ratios, &report.ratios, month_windows(&report.ratios, |r| r.month))
            .await?;

        Ok(if report.errors.is_empty() {
            SyncOutcome::Success { rows }
        } else {
            SyncOutcome::PartialWarning {
                rows,
                warnings: report.errors,
            }
        })
    }

    async fn sync_operational(&self, conn: &SyncConnection) -> Result<SyncOutcome> {
        let catalog = self.catalog.get_or_load(self.store).await?;
        let sheets = OperationalSheets {
            brand_tabs: conn.options.brand_tabs.clone(),
            ads_tab: conn.options.ads_tab.clone(),
        };
        let report = parse_operational_sheet(self.sheets, &conn.spreadsheet_id, &sheets, &catalog)
            .await?;
        println!("  Period: {}", report.period);

        let period = report.period;
        let mut rows = 0;
        rows += self
            .replace(
                Table::DailyChannel,
                &report.daily_channel,
                period_windows(&report.daily_channel, period, |r| r.date),
            )
            .await?;
        rows += self
            .replace(
                Table::DailyProduct,
                &report.daily_product,
                period_windows(&report.daily_product, period, |r| r.date),
            )
            .await?;
        rows += self
            .replace(Table::DailyAds, &report.ads, period_windows(&report.ads, period, |r| r.date))
            .await?;
        rows += self
            .upsert(
                Table::MonthlySummary,
                &report.monthly_summary,
                MONTHLY_SUMMARY_KEYS,
                Window::from(period),
            )
            .await?;

        Ok(if report.warnings.is_empty() {
            SyncOutcome::Success { rows }
        } else {
            SyncOutcome::PartialWarning {
                rows,
                warnings: report.warnings,
            }
        })
    }

    /// Delete every window from `table`, then insert `rows` in batches.
    async fn replace<T: Serialize>(
        &self,
        table: Table,
        rows: &[T],
        windows: Vec<Window>,
    ) -> Result<usize> {
        if windows.is_empty() {
            return Ok(0);
        }
        let values = to_values(rows)?;

        let Some(store) = self.writer()? else {
            println!(
                "  Dry run - would replace {} span(s) of {} with {} rows",
                windows.len(),
                table.name(),
                values.len()
            );
            return Ok(values.len());
        };

        for window in &windows {
            let deleted = store.delete_period(table, window.from, window.to).await?;
            info!("{}: deleted {} rows for {}", table.name(), deleted, window);
        }

        for batch in values.chunks(self.settings.batch_size.max(1)) {
            store.insert_batch(table, batch).await?;
        }
        println!("  {}: {} rows", table.name(), values.len());

        if self.settings.verify {
            self.verify(store, table, &windows, values.len()).await?;
        }
        Ok(values.len())
    }

    /// Clear `window`, then upsert `rows` on `keys`. Keys that disappeared
    /// from the sheet do not survive the clear.
    async fn upsert<T: Serialize>(
        &self,
        table: Table,
        rows: &[T],
        keys: &[&str],
        window: Window,
    ) -> Result<usize> {
        let values = to_values(rows)?;
        let Some(store) = self.writer()? else {
            println!("  Dry run - would upsert {} rows into {}", values.len(), table.name());
            return Ok(values.len());
        };

        let cleared = store.delete_period(table, window.from, window.to).await?;
        info!("{}: cleared {} rows for {}", table.name(), cleared, window);

        for batch in values.chunks(self.settings.batch_size.max(1)) {
            store.upsert(table, batch, keys).await?;
        }
        println!("  {}: {} rows upserted", table.name(), values.len());
        Ok(values.len())
    }

    async fn verify(
        &self,
        store: &dyn Store,
        table: Table,
        windows: &[Window],
        expected: usize,
    ) -> Result<()> {
        let mut stored = 0;
        for window in windows {
            stored += store
                .select_period(table, window.from, window.to)
                .await?
                .len();
        }
        if stored != expected {
            warn!(
                "{}: verify mismatch, wrote {} rows but {} are stored",
                table.name(),
                expected,
                stored
            );
        } else {
            info!("{}: verified {} rows", table.name(), stored);
        }
        Ok(())
    }
}

fn month_windows<T>(rows: &[T], month: impl Fn(&T) -> CanonicalMonth) -> Vec<Window> {
    let months: BTreeSet<CanonicalMonth> = rows.iter().map(month).collect();
    months.into_iter().map(Window::from).collect()
}

fn span(dates: &[NaiveDate]) -> Option<Window> {
    Some(Window {
        from: *dates.iter().min()?,
        to: *dates.iter().max()?,
    })
}

/// The whole `period` month, plus the exact date span of rows before it and
/// of rows after it. Neighbouring months are never cleared wholesale.
fn period_windows<T>(rows: &[T], period: CanonicalMonth, date: impl Fn(&T) -> NaiveDate) -> Vec<Window> {
    let month = Window::from(period);
    let (before, after): (Vec<NaiveDate>, Vec<NaiveDate>) = rows
        .iter()
        .map(date)
        .filter(|d| *d < month.from || *d > month.to)
        .partition(|d| *d < month.from);

    let mut windows = vec![month];
    windows.extend(span(&before));
    windows.extend(span(&after));
    windows.sort();
    windows
}
