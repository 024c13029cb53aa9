use chrono::NaiveDate;
use serde::Serialize;

use crate::cell::{cell_at, decode_date, to_number, Grid};

pub const ADS_TAB_RANGE: &str = "A1:G5000";

const DATE_COL: usize = 0;
const ACCOUNT_COL: usize = 1;
const SPENT_COL: usize = 2;
const OBJECTIVE_COL: usize = 3;
const SOURCE_COL: usize = 4;
const STORE_COL: usize = 5;
const ADVERTISER_COL: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAdsRecord {
    pub date: NaiveDate,
    pub ad_account: String,
    pub spent: f64,
    pub objective: String,
    pub source: String,
    pub store: String,
    pub advertiser: String,
}

/// One record per row whose first cell decodes as a date. Header and total
/// rows fall out naturally; zero-spend rows stay.
pub fn parse_ads(grid: &Grid) -> Vec<DailyAdsRecord> {
    (0..grid.len())
        .filter_map(|r| {
            let date = decode_date(cell_at(grid, r, DATE_COL))?;
            Some(DailyAdsRecord {
                date,
                ad_account: cell_at(grid, r, ACCOUNT_COL).as_text(),
                spent: to_number(cell_at(grid, r, SPENT_COL)),
                objective: cell_at(grid, r, OBJECTIVE_COL).as_text(),
                source: cell_at(grid, r, SOURCE_COL).as_text(),
                store: cell_at(grid, r, STORE_COL).as_text(),
                advertiser: cell_at(grid, r, ADVERTISER_COL).as_text(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_zero_spend_rows_are_kept() {
        let grid = vec![
            vec![text("Tanggal"), text("Akun"), text("Spent")],
            vec![
                text("12/01/2025"),
                text("ACC-1"),
                Cell::Number(150000.0),
                text("Conversion"),
                text("Meta"),
                text("Shopee"),
                text("Rina"),
            ],
            vec![text("12/02/2025"), text("ACC-1"), Cell::Number(0.0)],
            vec![text("Total"), Cell::Empty, Cell::Number(150000.0)],
        ];

        let ads = parse_ads(&grid);
        assert_eq!(ads.len(), 2);
        assert_eq!(ads[0].date, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(ads[0].source, "Meta");
        assert_eq!(ads[0].advertiser, "Rina");
        assert_eq!(ads[1].spent, 0.0);
        assert_eq!(ads[1].objective, "");
    }
}
