//! Financial statement parsers (PL, CF, Ratios).
//!
//! Each parser reads one fixed, oversized region of one tab, finds the month
//! columns on a known header row and scans data rows below it. The three are
//! independent: one failing leaves the other two intact in the report.

pub mod cf;
pub mod pl;
pub mod ratios;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::cell::Grid;
use crate::error::{ParseError, Result};
use crate::months::{locate_months, CanonicalMonth, MonthColumn};
use crate::source::{fetch, SheetSource};

pub use cf::CfRow;
pub use pl::PlRow;
pub use ratios::{parse_benchmark, Benchmark, RatioRow};

/// Where one statement lives inside its tab (0-based indices, range at A1).
#[derive(Debug, Clone)]
pub struct StatementLayout {
    pub statement: &'static str,
    pub sheet: String,
    pub range: &'static str,
    pub header_row: usize,
    pub month_start_col: usize,
    pub data_start_row: usize,
}

impl StatementLayout {
    pub fn pl(sheet: &str) -> Self {
        Self {
            statement: "PL",
            sheet: sheet.to_string(),
            range: "A1:BZ200",
            header_row: 3,
            month_start_col: 2,
            data_start_row: 4,
        }
    }

    pub fn cf(sheet: &str) -> Self {
        Self {
            statement: "CF",
            sheet: sheet.to_string(),
            range: "A1:BZ250",
            header_row: 3,
            month_start_col: 3,
            data_start_row: 4,
        }
    }

    pub fn ratios(sheet: &str) -> Self {
        Self {
            statement: "Ratios",
            sheet: sheet.to_string(),
            range: "A1:BZ100",
            header_row: 2,
            month_start_col: 3,
            data_start_row: 3,
        }
    }
}

/// Tab names of the three statements; each may be overridden per source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialSheets {
    pub pl: String,
    pub cf: String,
    pub ratios: String,
}

impl Default for FinancialSheets {
    fn default() -> Self {
        Self {
            pl: "PL".to_string(),
            cf: "CF".to_string(),
            ratios: "Ratios".to_string(),
        }
    }
}

/// Everything one financial source produced. `errors` holds one line per
/// statement that could not be parsed.
#[derive(Debug, Default, Serialize)]
pub struct FinancialReport {
    pub pl: Vec<PlRow>,
    pub cf: Vec<CfRow>,
    pub ratios: Vec<RatioRow>,
    pub months_found: Vec<CanonicalMonth>,
    pub errors: Vec<String>,
}

impl FinancialReport {
    pub fn row_count(&self) -> usize {
        self.pl.len() + self.cf.len() + self.ratios.len()
    }
}

/// Month columns on the layout's header row; no months is fatal for the statement.
pub(crate) fn month_columns(grid: &Grid, layout: &StatementLayout) -> Result<Vec<MonthColumn>> {
    let header = grid
        .get(layout.header_row)
        .ok_or_else(|| ParseError::SheetTooShort {
            sheet: layout.sheet.clone(),
            rows: grid.len(),
            needed: layout.header_row + 1,
        })?;

    let months: Vec<MonthColumn> = locate_months(header, layout.month_start_col).collect();
    if months.is_empty() {
        return Err(ParseError::NoMonthHeaders {
            sheet: layout.sheet.clone(),
        });
    }
    Ok(months)
}

async fn run_statement<S, T>(
    source: &S,
    spreadsheet_id: &str,
    layout: &StatementLayout,
    parse: fn(&Grid, &StatementLayout) -> Result<Vec<T>>,
) -> Result<Vec<T>>
where
    S: SheetSource + ?Sized,
{
    let grid = fetch(source, spreadsheet_id, &layout.sheet, layout.range).await?;
    parse(&grid, layout)
}

fn settle<T>(outcome: Result<Vec<T>>, statement: &str, errors: &mut Vec<String>) -> Vec<T> {
    match outcome {
        Ok(rows) => {
            info!("{}: parsed {} rows", statement, rows.len());
            rows
        }
        Err(e) => {
            warn!("{}: {}", statement, e);
            errors.push(format!("{}: {}", statement, e));
            Vec::new()
        }
    }
}

/// Parse all three statements of one spreadsheet. Never fails: a statement
/// that cannot be read or parsed shows up in `errors` instead.
pub async fn parse_financial_report<S: SheetSource + ?Sized>(
    source: &S,
    spreadsheet_id: &str,
    sheets: &FinancialSheets,
) -> FinancialReport {
    let mut errors = Vec::new();

    let pl_layout = StatementLayout::pl(&sheets.pl);
    let pl = settle(
        run_statement(source, spreadsheet_id, &pl_layout, pl::parse_pl).await,
        pl_layout.statement,
        &mut errors,
    );

    let cf_layout = StatementLayout::cf(&sheets.cf);
    let cf = settle(
        run_statement(source, spreadsheet_id, &cf_layout, cf::parse_cf).await,
        cf_layout.statement,
        &mut errors,
    );

    let ratio_layout = StatementLayout::ratios(&sheets.ratios);
    let ratios = settle(
        run_statement(source, spreadsheet_id, &ratio_layout, ratios::parse_ratios).await,
        ratio_layout.statement,
        &mut errors,
    );

    let mut months_found: Vec<CanonicalMonth> = pl
        .iter()
        .map(|r| r.month)
        .chain(cf.iter().map(|r| r.month))
        .chain(ratios.iter().map(|r| r.month))
        .collect();
    months_found.sort_unstable();
    months_found.dedup();

    FinancialReport {
        pl,
        cf,
        ratios,
        months_found,
        errors,
    }
}
