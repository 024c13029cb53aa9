use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{month_columns, StatementLayout};
use crate::cell::{cell_at, to_number, Grid};
use crate::error::Result;
use crate::labels::RATIO_LABELS;
use crate::months::CanonicalMonth;

const LABEL_COL: usize = 1;
const BENCHMARK_COL: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioRow {
    pub month: CanonicalMonth,
    pub line_item: String,
    pub line_item_label: String,
    pub section: String,
    pub amount: f64,
    pub benchmark_min: Option<f64>,
    pub benchmark_max: Option<f64>,
    pub benchmark_label: Option<String>,
}

/// Healthy range for a ratio, as decimal fractions when written in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Benchmark {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

static RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(-?\d+(?:[.,]\d+)?)\s*%?\s*(?:-|–|—|to|s/d|sampai)\s*(-?\d+(?:[.,]\d+)?)").unwrap()
});
static BOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(>=|<=|≥|≤|>|<)\s*(-?\d+(?:[.,]\d+)?)").unwrap());

fn number(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse().ok()
}

/// `"50% - 70%"` -> 0.5..0.7, `"1.2 - 2.0"` -> 1.2..2.0, `"> 1.5"` -> 1.5..
///
/// When the text has a `%` and the lower bound (or the only bound) is above
/// 1, both bounds are divided by 100.
pub fn parse_benchmark(text: &str) -> Option<Benchmark> {
    let (mut min, mut max) = if let Some(caps) = RANGE.captures(text) {
        (number(&caps[1]), number(&caps[2]))
    } else if let Some(caps) = BOUND.captures(text) {
        let value = number(&caps[2]);
        match &caps[1] {
            ">" | ">=" | "≥" => (value, None),
            _ => (None, value),
        }
    } else {
        return None;
    };

    if min.is_none() && max.is_none() {
        return None;
    }

    if text.contains('%') && min.or(max).is_some_and(|v| v > 1.0) {
        min = min.map(|v| v / 100.0);
        max = max.map(|v| v / 100.0);
    }
    Some(Benchmark { min, max })
}

pub fn parse_ratios(grid: &Grid, layout: &StatementLayout) -> Result<Vec<RatioRow>> {
    let months = month_columns(grid, layout)?;
    let first_col = months[0].col;

    let mut rows = Vec::new();
    for r in layout.data_start_row..grid.len() {
        if cell_at(grid, r, first_col).is_blank() {
            continue;
        }
        let Some(mapping) = RATIO_LABELS.resolve(&cell_at(grid, r, LABEL_COL).as_text()) else {
            continue;
        };

        let benchmark_text = cell_at(grid, r, BENCHMARK_COL).as_text();
        let benchmark = parse_benchmark(&benchmark_text);
        let benchmark_label = (!benchmark_text.is_empty()).then_some(benchmark_text);

        for mc in &months {
            rows.push(RatioRow {
                month: mc.month,
                line_item: mapping.key.clone(),
                line_item_label: mapping.raw_label.clone(),
                section: mapping.section.clone(),
                amount: to_number(cell_at(grid, r, mc.col)),
                benchmark_min: benchmark.and_then(|b| b.min),
                benchmark_max: benchmark.and_then(|b| b.max),
                benchmark_label: benchmark_label.clone(),
            });
        }
    }

    debug!("Ratios: {} rows from sheet '{}'", rows.len(), layout.sheet);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    // -------------------------------------------------------------------------
    // BENCHMARKS
    // -------------------------------------------------------------------------

    #[test]
    fn test_percent_benchmark_normalised() {
        let b = parse_benchmark("50% - 70%").unwrap();
        assert_eq!(b.min, Some(0.5));
        assert_eq!(b.max, Some(0.7));
    }

    #[test]
    fn test_plain_benchmark_unchanged() {
        let b = parse_benchmark("1.2 - 2.0").unwrap();
        assert_eq!(b.min, Some(1.2));
        assert_eq!(b.max, Some(2.0));
    }

    #[test]
    fn test_percent_benchmark_already_fraction() {
        // min is not above 1, so nothing is divided
        let b = parse_benchmark("0.3% - 0.9%").unwrap();
        assert_eq!(b.min, Some(0.3));
        assert_eq!(b.max, Some(0.9));
    }

    #[test]
    fn test_benchmark_variants() {
        let b = parse_benchmark("30 s/d 60%").unwrap();
        assert_eq!(b.min, Some(0.3));
        assert_eq!(b.max, Some(0.6));

        let b = parse_benchmark("1,5 - 2,5").unwrap();
        assert_eq!(b.min, Some(1.5));
        assert_eq!(b.max, Some(2.5));
    }

    #[test]
    fn test_single_bound_benchmarks() {
        let b = parse_benchmark("> 1.5").unwrap();
        assert_eq!(b.min, Some(1.5));
        assert_eq!(b.max, None);

        let b = parse_benchmark("< 30%").unwrap();
        assert_eq!(b.min, None);
        assert_eq!(b.max, Some(0.3));
    }

    #[test]
    fn test_unparseable_benchmark() {
        assert_eq!(parse_benchmark(""), None);
        assert_eq!(parse_benchmark("lihat catatan"), None);
    }

    // -------------------------------------------------------------------------
    // SHEET
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_ratios() {
        let grid = vec![
            vec![],
            vec![],
            vec![
                Cell::Empty,
                text("Rasio"),
                text("Benchmark"),
                text("Nov 2025"),
                text("Dec 2025"),
            ],
            vec![Cell::Empty, text("LIKUIDITAS")],
            vec![
                Cell::Empty,
                text("Current Ratio"),
                text("1.2 - 2.0"),
                Cell::Number(1.4),
                Cell::Number(1.6),
            ],
            vec![
                Cell::Empty,
                text("Gross Profit Margin"),
                text("50% - 70%"),
                text("55%"),
                Cell::Number(0.61),
            ],
        ];

        let rows = parse_ratios(&grid, &StatementLayout::ratios("Ratios")).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].line_item, "current_ratio");
        assert_eq!(rows[0].section, "liquidity");
        assert_eq!(rows[0].benchmark_min, Some(1.2));
        assert_eq!(rows[2].line_item, "gross_margin");
        assert_eq!(rows[2].amount, 0.55);
        assert_eq!(rows[2].benchmark_min, Some(0.5));
        assert_eq!(rows[2].benchmark_label.as_deref(), Some("50% - 70%"));
        assert_eq!(rows[3].amount, 0.61);
    }
}
