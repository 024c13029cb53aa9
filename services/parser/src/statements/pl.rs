use log::debug;
use serde::Serialize;

use super::{month_columns, StatementLayout};
use crate::cell::{cell_at, to_number, to_optional_number, Grid};
use crate::error::Result;
use crate::labels::PL_LABELS;
use crate::months::CanonicalMonth;

const LABEL_COL: usize = 1;
/// Offsets of the "% of sales" and "% of net sales" columns from a month column.
const PCT_SALES_OFFSET: usize = 1;
const PCT_NET_SALES_OFFSET: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlRow {
    pub month: CanonicalMonth,
    pub line_item: String,
    pub line_item_label: String,
    pub section: String,
    pub amount: f64,
    pub pct_sales: Option<f64>,
    pub pct_net_sales: Option<f64>,
}

pub fn parse_pl(grid: &Grid, layout: &StatementLayout) -> Result<Vec<PlRow>> {
    let months = month_columns(grid, layout)?;
    let first_col = months[0].col;

    let mut rows = Vec::new();
    for r in layout.data_start_row..grid.len() {
        // section headers carry no value in the first month column
        if cell_at(grid, r, first_col).is_blank() {
            continue;
        }
        let Some(mapping) = PL_LABELS.resolve(&cell_at(grid, r, LABEL_COL).as_text()) else {
            continue;
        };

        for mc in &months {
            rows.push(PlRow {
                month: mc.month,
                line_item: mapping.key.clone(),
                line_item_label: mapping.raw_label.clone(),
                section: mapping.section.clone(),
                amount: to_number(cell_at(grid, r, mc.col)),
                pct_sales: to_optional_number(cell_at(grid, r, mc.col + PCT_SALES_OFFSET)),
                pct_net_sales: to_optional_number(cell_at(grid, r, mc.col + PCT_NET_SALES_OFFSET)),
            });
        }
    }

    debug!(
        "PL: {} month columns, {} rows from sheet '{}'",
        months.len(),
        rows.len(),
        layout.sheet
    );
    Ok(rows)
}
