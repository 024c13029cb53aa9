//! Raw cell values and their coercion into numbers, dates and label keys.
//!
//! Nothing in here fails: a cell that cannot be read as a number is 0, a
//! cell that cannot be read as a date is `None`.

use calamine::Data;
use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// One spreadsheet cell as handed over by a [`crate::source::SheetSource`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

/// Rows of cells, anchored at the top-left corner of the requested range.
/// Rows may be ragged: trailing empty cells and rows are usually omitted.
pub type Grid = Vec<Vec<Cell>>;

static EMPTY: Cell = Cell::Empty;

/// Bounds-safe grid access; anything outside the grid reads as empty.
pub fn cell_at(grid: &Grid, row: usize, col: usize) -> &Cell {
    grid.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed text rendering, used for labels and free-text columns.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Cell::Date(d) => to_iso(*d),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => {
                let serial = dt.as_f64();
                serial_to_date(serial)
                    .map(Cell::Date)
                    .unwrap_or(Cell::Number(serial))
            }
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

impl From<&serde_json::Value> for Cell {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            Value::String(s) if s.is_empty() => Cell::Empty,
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

// =============================================================================
// Numbers
// =============================================================================

/// Coerce a cell to a finite number. Blank, `-`, and unparseable text are 0.
pub fn to_number(cell: &Cell) -> f64 {
    let n = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => parse_number_text(s),
        Cell::Empty | Cell::Bool(_) | Cell::Date(_) => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// `Some(number)` for non-blank cells, `None` for blank ones.
pub fn to_optional_number(cell: &Cell) -> Option<f64> {
    if cell.is_blank() {
        None
    } else {
        Some(to_number(cell))
    }
}

/// Locale-tolerant text to number: `1.234.567,50`, `1,234,567.50`,
/// `Rp 15.000.000`, `(2.500,00)`, `12,5%`.
pub fn parse_number_text(raw: &str) -> f64 {
    let mut s = raw.trim();
    if s.is_empty() || s.chars().all(|c| c == '-' || c == '–') {
        return 0.0;
    }

    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }
    let percent = s.ends_with('%');

    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let digits = match cleaned.strip_prefix('-') {
        Some(rest) => {
            negative = !negative;
            rest
        }
        None => cleaned.as_str(),
    };

    let mut value = normalize_separators(digits).parse::<f64>().unwrap_or(0.0);
    if negative {
        value = -value;
    }
    if percent {
        value /= 100.0;
    }
    value
}

/// Rewrite thousands/decimal separators into a plain `1234.5` form.
fn normalize_separators(s: &str) -> String {
    let dots = s.matches('.').count();
    let commas = s.matches(',').count();
    match (dots, commas) {
        (0, 0) => s.to_string(),
        (1, 0) => single_mark(s, '.'),
        (_, 0) => s.replace('.', ""),
        (0, 1) => single_mark(s, ','),
        (0, _) => s.replace(',', ""),
        _ => {
            // both marks present: whichever comes last is the decimal mark
            if s.rfind(',') > s.rfind('.') {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
    }
}

/// A lone mark followed by exactly three digits groups thousands
/// (`15.000`, `150,000`); otherwise it is the decimal mark (`1.5`, `0,125`).
fn single_mark(s: &str, mark: char) -> String {
    match s.split_once(mark) {
        Some((int, frac)) if frac.len() == 3 && !int.is_empty() && int != "0" => {
            format!("{int}{frac}")
        }
        _ => s.replacen(mark, ".", 1),
    }
}

// =============================================================================
// Dates
// =============================================================================

/// Serial numbers outside `[SERIAL_MIN, SERIAL_MAX)` are not treated as dates.
pub const SERIAL_MIN: f64 = 25569.0; // 1970-01-01
pub const SERIAL_MAX: f64 = 73051.0; // 2100-01-01

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})(?:\s.*)?$").unwrap());
static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").unwrap());

/// Spreadsheet serial (days since 1899-12-30) to a calendar date, no range check.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Decode a date cell. `None` means "no date here", never an error.
pub fn decode_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) if (SERIAL_MIN..SERIAL_MAX).contains(n) => serial_to_date(*n),
        Cell::Text(s) => decode_date_text(s),
        _ => None,
    }
}

fn decode_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Some(caps) = SLASH_DATE.captures(s) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let mut year: i32 = caps[3].parse().ok()?;
        if caps[3].len() == 2 {
            year += 2000;
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = ISO_DATE.captures(s) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// =============================================================================
// Labels
// =============================================================================

/// Lowercase, trim, collapse inner whitespace.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Deterministic key for a free-text label: `"Biaya Konsultan (Baru)"` ->
/// `"biaya_konsultan_baru"`.
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else if c.is_whitespace() || matches!(c, '_' | '-' | '/') {
            pending_sep = true;
        }
    }
    out
}
