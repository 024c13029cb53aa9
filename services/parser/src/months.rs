//! Month-header recognition: turns header cells like `Dec 2025`,
//! `Desember 2025`, `Des 2025`, `2025-12-01` or serial `46000` into a
//! [`CanonicalMonth`].

use std::fmt;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::cell::{normalize_label, serial_to_date, Cell, SERIAL_MAX, SERIAL_MIN};

/// A reporting period. Stored and serialised as its first calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalMonth {
    pub year: i32,
    pub month: u32,
}

impl CanonicalMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (y, m) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(y, m, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }
}

impl fmt::Display for CanonicalMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-01", self.year, self.month)
    }
}

impl Serialize for CanonicalMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One recognised month column in a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthColumn {
    pub col: usize,
    pub month: CanonicalMonth,
}

const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2100;

const EN_ABBREV: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const EN_FULL: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];
const ID_FULL: [&str; 12] = [
    "januari", "februari", "maret", "april", "mei", "juni", "juli", "agustus", "september",
    "oktober", "november", "desember",
];
const ID_ABBREV: [&str; 12] = [
    "jan", "feb", "mar", "apr", "mei", "jun", "jul", "agu", "sep", "okt", "nov", "des",
];

static WORD_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]+)\.?[\s\-/'.]*(\d{4})$").unwrap());
static ISO_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").unwrap());

fn position(table: &[&str; 12], word: &str) -> Option<u32> {
    table.iter().position(|m| *m == word).map(|i| i as u32 + 1)
}

/// English abbreviation (`Dec`, also `Sept`) or full name.
fn english(word: &str) -> Option<u32> {
    let word = if word == "sept" { "sep" } else { word };
    position(&EN_ABBREV, word).or_else(|| position(&EN_FULL, word))
}

fn indonesian_full(word: &str) -> Option<u32> {
    position(&ID_FULL, word)
}

fn indonesian_abbrev(word: &str) -> Option<u32> {
    let word = if word == "ags" { "agu" } else { word };
    position(&ID_ABBREV, word)
}

/// Month-name matchers in priority order; the first hit wins.
const WORD_MATCHERS: [fn(&str) -> Option<u32>; 3] = [english, indonesian_full, indonesian_abbrev];

fn month_from_serial(serial: f64) -> Option<CanonicalMonth> {
    if !(SERIAL_MIN..SERIAL_MAX).contains(&serial) {
        return None;
    }
    serial_to_date(serial).map(CanonicalMonth::from_date)
}

fn month_from_text(raw: &str) -> Option<CanonicalMonth> {
    let text = normalize_label(raw);
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = WORD_YEAR.captures(&text) {
        let year: i32 = caps[2].parse().ok()?;
        let month = WORD_MATCHERS.iter().find_map(|m| m(&caps[1]))?;
        return CanonicalMonth::new(year, month);
    }

    if let Some(caps) = ISO_PREFIX.captures(&text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        return CanonicalMonth::new(year, month);
    }

    text.parse::<u32>().ok().and_then(|n| month_from_serial(n as f64))
}

/// Recognise one header cell. Unrecognised cells are `None`, never an error.
pub fn parse_month_cell(cell: &Cell) -> Option<CanonicalMonth> {
    match cell {
        Cell::Date(d) => Some(CanonicalMonth::from_date(*d)),
        Cell::Number(n) => month_from_serial(*n),
        Cell::Text(s) => month_from_text(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// Lazily walk `row` from `start_col`, yielding every recognised month column
/// in column order. Duplicate months are all kept.
pub fn locate_months(row: &[Cell], start_col: usize) -> impl Iterator<Item = MonthColumn> + '_ {
    row.iter()
        .enumerate()
        .skip(start_col)
        .filter_map(|(col, cell)| parse_month_cell(cell).map(|month| MonthColumn { col, month }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec_2025() -> CanonicalMonth {
        CanonicalMonth::new(2025, 12).unwrap()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    // -------------------------------------------------------------------------
    // FORMATS
    // -------------------------------------------------------------------------

    #[test]
    fn test_every_format_yields_same_month() {
        let cells = [
            text("Dec 2025"),
            text("Desember 2025"),
            text("Des 2025"),
            text("2025-12-01"),
            Cell::Number(46000.0),
        ];
        for cell in &cells {
            assert_eq!(parse_month_cell(cell), Some(dec_2025()), "{:?}", cell);
            assert_eq!(parse_month_cell(cell).unwrap().to_string(), "2025-12-01");
        }
    }

    #[test]
    fn test_format_variants() {
        assert_eq!(parse_month_cell(&text("DEC-2025")), Some(dec_2025()));
        assert_eq!(parse_month_cell(&text("December 2025")), Some(dec_2025()));
        assert_eq!(parse_month_cell(&text("  des  2025 ")), Some(dec_2025()));
        assert_eq!(parse_month_cell(&text("Dec'2025")), Some(dec_2025()));
        assert_eq!(parse_month_cell(&text("46000")), Some(dec_2025()));
        assert_eq!(
            parse_month_cell(&Cell::Date(NaiveDate::from_ymd_opt(2025, 12, 17).unwrap())),
            Some(dec_2025())
        );
    }

    #[test]
    fn test_indonesian_months() {
        let expected = CanonicalMonth::new(2025, 8).unwrap();
        assert_eq!(parse_month_cell(&text("Agustus 2025")), Some(expected));
        assert_eq!(parse_month_cell(&text("Agu 2025")), Some(expected));
        assert_eq!(parse_month_cell(&text("Ags 2025")), Some(expected));
        assert_eq!(
            parse_month_cell(&text("Okt 2024")),
            CanonicalMonth::new(2024, 10)
        );
        assert_eq!(parse_month_cell(&text("Mei 2024")), CanonicalMonth::new(2024, 5));
    }

    #[test]
    fn test_unrecognised_cells() {
        assert_eq!(parse_month_cell(&text("Keterangan")), None);
        assert_eq!(parse_month_cell(&text("% Sales")), None);
        assert_eq!(parse_month_cell(&text("Total 2025")), None);
        assert_eq!(parse_month_cell(&text("Dec 1850")), None);
        assert_eq!(parse_month_cell(&Cell::Number(12.5)), None);
        assert_eq!(parse_month_cell(&Cell::Empty), None);
    }

    // -------------------------------------------------------------------------
    // LOCATOR
    // -------------------------------------------------------------------------

    #[test]
    fn test_locate_months_skips_non_months() {
        let row = vec![
            text("No"),
            text("Keterangan"),
            text("Nov 2025"),
            text("% Sales"),
            text("% Net"),
            text("Des 2025"),
        ];
        let found: Vec<MonthColumn> = locate_months(&row, 2).collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].col, 2);
        assert_eq!(found[0].month, CanonicalMonth::new(2025, 11).unwrap());
        assert_eq!(found[1].col, 5);
        assert_eq!(found[1].month, dec_2025());
    }

    #[test]
    fn test_locate_months_respects_start_col() {
        let row = vec![text("Jan 2025"), text("label"), text("Feb 2025")];
        let found: Vec<MonthColumn> = locate_months(&row, 1).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].col, 2);
    }

    #[test]
    fn test_locate_months_keeps_duplicates() {
        let row = vec![text("Dec 2025"), text("Desember 2025")];
        let found: Vec<MonthColumn> = locate_months(&row, 0).collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].month, found[1].month);
    }

    // -------------------------------------------------------------------------
    // PERIOD BOUNDS
    // -------------------------------------------------------------------------

    #[test]
    fn test_month_bounds() {
        let feb = CanonicalMonth::new(2024, 2).unwrap();
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(dec_2025().last_day(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn test_month_serialises_as_first_day() {
        let json = serde_json::to_string(&dec_2025()).unwrap();
        assert_eq!(json, "\"2025-12-01\"");
    }
}
