//! In-memory store and sample spreadsheets for the sync tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use sheets_parser::cell::Cell;
use sheets_parser::operational::layout::{DATE_ROW, FIRST_DATE_COL, NET_SALES_BASE};
use sheets_parser::{Grid, MemorySource, ProductEntry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::config::SyncConnection;
use crate::store::{Store, Table};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Delete(Table),
    Insert(Table, usize),
    Upsert(Table, usize),
}

impl Op {
    pub fn table(&self) -> Table {
        match self {
            Op::Delete(t) | Op::Insert(t, _) | Op::Upsert(t, _) => *t,
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    ops: Mutex<Vec<Op>>,
    statuses: Mutex<HashMap<Uuid, (String, String)>>,
    failing_table: Mutex<Option<Table>>,
    fail_status: AtomicBool,
    catalog_loads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: Table, rows: Vec<Value>) {
        self.tables.lock().unwrap().entry(table).or_default().extend(rows);
    }

    pub fn fail_inserts_into(&self, table: Table) {
        *self.failing_table.lock().unwrap() = Some(table);
    }

    pub fn fail_status_writes(&self) {
        self.fail_status.store(true, Ordering::SeqCst);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables.lock().unwrap().get(&table).cloned().unwrap_or_default()
    }

    pub fn count(&self, table: Table) -> usize {
        self.rows(table).len()
    }

    pub fn counts(&self) -> HashMap<Table, usize> {
        self.tables
            .lock()
            .unwrap()
            .iter()
            .map(|(t, rows)| (*t, rows.len()))
            .collect()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn status_of(&self, id: Uuid) -> Option<(String, String)> {
        self.statuses.lock().unwrap().get(&id).cloned()
    }

    pub fn catalog_loads(&self) -> usize {
        self.catalog_loads.load(Ordering::SeqCst)
    }
}

fn in_period(row: &Value, column: &str, from: NaiveDate, to: NaiveDate) -> bool {
    row.get(column)
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .is_some_and(|d| d >= from && d <= to)
}

#[async_trait]
impl Store for MemoryStore {
    async fn delete_period(&self, table: Table, from: NaiveDate, to: NaiveDate) -> Result<u64> {
        self.ops.lock().unwrap().push(Op::Delete(table));
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|r| !in_period(r, table.period_column(), from, to));
        Ok((before - rows.len()) as u64)
    }

    async fn insert_batch(&self, table: Table, rows: &[Value]) -> Result<u64> {
        if *self.failing_table.lock().unwrap() == Some(table) {
            anyhow::bail!("insert into {} failed: connection reset", table.name());
        }
        self.ops.lock().unwrap().push(Op::Insert(table, rows.len()));
        self.tables
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn upsert(&self, table: Table, rows: &[Value], conflict: &[&str]) -> Result<u64> {
        self.ops.lock().unwrap().push(Op::Upsert(table, rows.len()));
        let mut tables = self.tables.lock().unwrap();
        let stored = tables.entry(table).or_default();
        for row in rows {
            stored.retain(|existing| !conflict.iter().all(|k| existing.get(*k) == row.get(*k)));
            stored.push(row.clone());
        }
        Ok(rows.len() as u64)
    }

    async fn select_period(&self, table: Table, from: NaiveDate, to: NaiveDate) -> Result<Vec<Value>> {
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|r| in_period(r, table.period_column(), from, to))
            .collect())
    }

    async fn load_connections(&self) -> Result<Vec<SyncConnection>> {
        Ok(Vec::new())
    }

    async fn record_status(&self, connection_id: Uuid, status: &str, message: &str) -> Result<()> {
        if self.fail_status.load(Ordering::SeqCst) {
            anyhow::bail!("sync_connections is locked");
        }
        self.statuses
            .lock()
            .unwrap()
            .insert(connection_id, (status.to_string(), message.to_string()));
        Ok(())
    }

    async fn load_product_catalog(&self) -> Result<Vec<ProductEntry>> {
        self.catalog_loads.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ProductEntry {
            product_name: "Glow Serum".to_string(),
            brand: "Lumi".to_string(),
            product_type: Some("Skincare".to_string()),
        }])
    }
}

// =============================================================================
// Sample spreadsheets
// =============================================================================

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

fn num(n: f64) -> Cell {
    Cell::Number(n)
}

fn set(grid: &mut Grid, row: usize, col: usize, cell: Cell) {
    if grid.len() <= row {
        grid.resize(row + 1, Vec::new());
    }
    if grid[row].len() <= col {
        grid[row].resize(col + 1, Cell::Empty);
    }
    grid[row][col] = cell;
}

/// PL, CF and Ratios tabs with one line item over Nov and Dec 2025. With
/// `cf_ok` false the CF header row has no months.
pub fn financial_source(cf_ok: bool) -> MemorySource {
    let pl = vec![
        vec![],
        vec![],
        vec![],
        vec![
            Cell::Empty,
            text("Keterangan"),
            text("Nov 2025"),
            text("% Sales"),
            text("% Net"),
            text("Dec 2025"),
        ],
        vec![
            Cell::Empty,
            text("Penjualan Bersih"),
            num(1000.0),
            num(1.0),
            num(1.0),
            num(1200.0),
        ],
    ];

    let cf_header = if cf_ok {
        vec![
            Cell::Empty,
            text("Keterangan"),
            Cell::Empty,
            text("Nov 2025"),
            text("Dec 2025"),
        ]
    } else {
        vec![Cell::Empty, text("Keterangan"), Cell::Empty, text("Total")]
    };
    let cf = vec![
        vec![],
        vec![],
        vec![],
        cf_header,
        vec![
            Cell::Empty,
            text("Saldo Awal Kas"),
            Cell::Empty,
            num(10.0),
            num(20.0),
        ],
    ];

    let ratios = vec![
        vec![],
        vec![],
        vec![
            Cell::Empty,
            text("Rasio"),
            text("Benchmark"),
            text("Nov 2025"),
            text("Dec 2025"),
        ],
        vec![
            Cell::Empty,
            text("Current Ratio"),
            text("1.2 - 2.0"),
            num(1.4),
            num(1.6),
        ],
    ];

    MemorySource::new()
        .with_sheet("PL", pl)
        .with_sheet("CF", cf)
        .with_sheet("Ratios", ratios)
}

/// A "Glow Serum" brand tab with Shopee sales on 1 and 2 Dec 2025, plus an
/// "Ads" tab with one paid and one zero-spend day.
pub fn operational_source() -> MemorySource {
    operational_source_for(&[("12/01/2025", 100.0), ("12/02/2025", 200.0)])
}

/// Same tabs as `operational_source`, with one Shopee sales column per day.
pub fn operational_source_for(days: &[(&str, f64)]) -> MemorySource {
    let mut serum: Grid = vec![Vec::new(); 30];
    for (i, (date, sales)) in days.iter().enumerate() {
        set(&mut serum, DATE_ROW, FIRST_DATE_COL + i, text(date));
        set(&mut serum, NET_SALES_BASE, FIRST_DATE_COL + i, num(*sales));
    }
    set(&mut serum, 26, 1, text("Biaya Marketing"));

    let ads = vec![
        vec![text("Tanggal"), text("Akun"), text("Spent")],
        vec![text("12/01/2025"), text("ACC-1"), num(50.0)],
        vec![text("12/02/2025"), text("ACC-1"), num(0.0)],
    ];

    MemorySource::new()
        .with_sheet("Glow Serum", serum)
        .with_sheet("Ads", ads)
}
