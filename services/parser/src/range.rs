//! A1-notation ranges (`A1:BZ200`, `A2:G`).

use crate::error::{ParseError, Result};

/// Zero-based, inclusive rectangle. An open end (`A2:G`) has no `end_row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: Option<usize>,
    pub end_col: usize,
}

impl CellRange {
    pub fn parse(a1: &str) -> Result<Self> {
        let (start, end) = a1
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidRange(a1.to_string()))?;
        let (start_col, start_row) = split_ref(start)
            .and_then(|(c, r)| Some((c, r?)))
            .ok_or_else(|| ParseError::InvalidRange(a1.to_string()))?;
        let (end_col, end_row) =
            split_ref(end).ok_or_else(|| ParseError::InvalidRange(a1.to_string()))?;

        if end_col < start_col || end_row.is_some_and(|r| r < start_row) {
            return Err(ParseError::InvalidRange(a1.to_string()));
        }

        Ok(Self {
            start_row,
            start_col,
            end_row,
            end_col,
        })
    }

    pub fn width(&self) -> usize {
        self.end_col - self.start_col + 1
    }
}

/// `"AZ200"` -> `(51, Some(199))`, `"G"` -> `(6, None)`.
fn split_ref(reference: &str) -> Option<(usize, Option<usize>)> {
    let reference = reference.trim();
    let letters: String = reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let digits = &reference[letters.len()..];

    let col = letters
        .chars()
        .try_fold(0usize, |acc, c| {
            let v = (c.to_ascii_uppercase() as u8).checked_sub(b'A')? as usize + 1;
            acc.checked_mul(26)?.checked_add(v)
        })?
        - 1;

    let row = if digits.is_empty() {
        None
    } else {
        let n: usize = digits.parse().ok()?;
        Some(n.checked_sub(1)?)
    };
    Some((col, row))
}

/// Sheet-qualified range as the Sheets API expects it: `'Brand A'!A1:AZ80`.
pub fn qualified(sheet: &str, range: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), range)
}
