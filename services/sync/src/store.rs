//! Persistence for parsed rows, connections and the product catalog.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use sheets_parser::ProductEntry;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::{SourceKind, SourceOptions, SyncConnection};

/// Every table the sync writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    ProfitLoss,
    CashFlow,
    Ratios,
    DailyChannel,
    DailyProduct,
    DailyAds,
    MonthlySummary,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::ProfitLoss => "financial_pl",
            Table::CashFlow => "financial_cf",
            Table::Ratios => "financial_ratios",
            Table::DailyChannel => "daily_channel",
            Table::DailyProduct => "daily_product",
            Table::DailyAds => "daily_ads",
            Table::MonthlySummary => "monthly_summary",
        }
    }

    /// Date column that period deletes filter on.
    pub fn period_column(self) -> &'static str {
        match self {
            Table::ProfitLoss | Table::CashFlow | Table::Ratios => "month",
            Table::DailyChannel | Table::DailyProduct | Table::DailyAds => "date",
            Table::MonthlySummary => "period",
        }
    }

    /// Columns written from the serialised row, in field order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::ProfitLoss => &[
                "month",
                "line_item",
                "line_item_label",
                "section",
                "amount",
                "pct_sales",
                "pct_net_sales",
            ],
            Table::CashFlow => &[
                "month",
                "line_item",
                "line_item_label",
                "section",
                "sub_section",
                "amount",
            ],
            Table::Ratios => &[
                "month",
                "line_item",
                "line_item_label",
                "section",
                "amount",
                "benchmark_min",
                "benchmark_max",
                "benchmark_label",
            ],
            Table::DailyChannel => &[
                "date",
                "product",
                "brand",
                "channel",
                "net_sales",
                "gross_profit",
                "marketplace_admin_cost",
                "net_after_marketing",
            ],
            Table::DailyProduct => &[
                "date",
                "product",
                "brand",
                "net_sales",
                "gross_profit",
                "marketplace_admin_cost",
                "marketing_cost",
                "net_after_marketing",
            ],
            Table::DailyAds => &[
                "date",
                "ad_account",
                "spent",
                "objective",
                "source",
                "store",
                "advertiser",
            ],
            Table::MonthlySummary => &[
                "period",
                "product",
                "brand",
                "net_sales",
                "gross_profit",
                "marketplace_admin_cost",
                "marketing_cost",
                "net_after_marketing",
                "active_days",
            ],
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Delete rows whose period column lies in `[from, to]`. Returns rows removed.
    async fn delete_period(&self, table: Table, from: NaiveDate, to: NaiveDate) -> Result<u64>;

    async fn insert_batch(&self, table: Table, rows: &[Value]) -> Result<u64>;

    /// Insert or update on `conflict` columns.
    async fn upsert(&self, table: Table, rows: &[Value], conflict: &[&str]) -> Result<u64>;

    async fn select_period(&self, table: Table, from: NaiveDate, to: NaiveDate) -> Result<Vec<Value>>;

    async fn load_connections(&self) -> Result<Vec<SyncConnection>>;

    async fn record_status(&self, connection_id: Uuid, status: &str, message: &str) -> Result<()>;

    async fn load_product_catalog(&self) -> Result<Vec<ProductEntry>>;
}

// =============================================================================
// Postgres
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ConnectionRow {
    id: Uuid,
    name: String,
    kind: String,
    spreadsheet_id: String,
    is_active: bool,
    options: Option<Json<SourceOptions>>,
}

impl TryFrom<ConnectionRow> for SyncConnection {
    type Error = anyhow::Error;

    fn try_from(row: ConnectionRow) -> Result<Self> {
        Ok(SyncConnection {
            id: row.id,
            kind: row
                .kind
                .parse::<SourceKind>()
                .with_context(|| format!("connection '{}'", row.name))?,
            name: row.name,
            spreadsheet_id: row.spreadsheet_id,
            is_active: row.is_active,
            options: row.options.map(|o| o.0).unwrap_or_default(),
        })
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(db_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn delete_period(&self, table: Table, from: NaiveDate, to: NaiveDate) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE {col} >= $1 AND {col} <= $2",
            table.name(),
            col = table.period_column()
        );
        let result = sqlx::query(&sql)
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await
            .with_context(|| format!("delete from {} failed", table.name()))?;
        Ok(result.rows_affected())
    }

    async fn insert_batch(&self, table: Table, rows: &[Value]) -> Result<u64> {
        let columns = table.columns().join(", ");
        let sql = format!(
            r#"
            INSERT INTO {t} ({cols})
            SELECT {cols} FROM jsonb_populate_recordset(NULL::{t}, $1)
            "#,
            t = table.name(),
            cols = columns
        );
        let result = sqlx::query(&sql)
            .bind(Json(rows))
            .execute(&self.pool)
            .await
            .with_context(|| format!("insert into {} failed", table.name()))?;
        Ok(result.rows_affected())
    }

    async fn upsert(&self, table: Table, rows: &[Value], conflict: &[&str]) -> Result<u64> {
        let columns = table.columns().join(", ");
        let updates = table
            .columns()
            .iter()
            .filter(|c| !conflict.contains(*c))
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            INSERT INTO {t} ({cols})
            SELECT {cols} FROM jsonb_populate_recordset(NULL::{t}, $1)
            ON CONFLICT ({keys}) DO UPDATE SET {updates}, updated_at = now()
            "#,
            t = table.name(),
            cols = columns,
            keys = conflict.join(", "),
            updates = updates
        );
        let result = sqlx::query(&sql)
            .bind(Json(rows))
            .execute(&self.pool)
            .await
            .with_context(|| format!("upsert into {} failed", table.name()))?;
        Ok(result.rows_affected())
    }

    async fn select_period(&self, table: Table, from: NaiveDate, to: NaiveDate) -> Result<Vec<Value>> {
        let sql = format!(
            "SELECT to_jsonb(t) FROM {} t WHERE {col} >= $1 AND {col} <= $2",
            table.name(),
            col = table.period_column()
        );
        let rows: Vec<Value> = sqlx::query_scalar(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("select from {} failed", table.name()))?;
        Ok(rows)
    }

    async fn load_connections(&self) -> Result<Vec<SyncConnection>> {
        let rows: Vec<ConnectionRow> = sqlx::query_as(
            r#"
            SELECT id, name, kind, spreadsheet_id, is_active, options
            FROM sync_connections
            WHERE is_active
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load sync connections")?;

        rows.into_iter().map(SyncConnection::try_from).collect()
    }

    async fn record_status(&self, connection_id: Uuid, status: &str, message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sync_connections
            SET last_synced_at = now(), last_status = $2, last_message = $3
            WHERE id = $1
            "#,
        )
        .bind(connection_id)
        .bind(status)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_product_catalog(&self) -> Result<Vec<ProductEntry>> {
        let rows: Vec<(String, String, Option<String>)> =
            sqlx::query_as("SELECT product_name, brand, product_type FROM product_catalog")
                .fetch_all(&self.pool)
                .await
                .context("Failed to load product catalog")?;

        Ok(rows
            .into_iter()
            .map(|(product_name, brand, product_type)| ProductEntry {
                product_name,
                brand,
                product_type,
            })
            .collect())
    }
}
