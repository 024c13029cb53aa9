//! Where grids come from: the [`SheetSource`] seam plus an in-memory
//! implementation backed by a local workbook or hand-built grids.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use calamine::{open_workbook_auto, Reader};
use log::{debug, warn};

use crate::cell::{Cell, Grid};
use crate::error::ParseError;
use crate::range::CellRange;

/// Read a rectangular range of one tab. Values come back unformatted,
/// except date cells which may arrive as formatted strings.
///
/// Implementations do not retry; a failed read is reported as-is.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn get_range(&self, spreadsheet_id: &str, sheet: &str, range: &str) -> Result<Grid>;
}

/// Fetch through a source, turning any failure into `SourceUnavailable`
/// with the underlying message kept verbatim.
pub(crate) async fn fetch<S: SheetSource + ?Sized>(
    source: &S,
    spreadsheet_id: &str,
    sheet: &str,
    range: &str,
) -> crate::error::Result<Grid> {
    source
        .get_range(spreadsheet_id, sheet, range)
        .await
        .map_err(|e| ParseError::SourceUnavailable {
            sheet: sheet.to_string(),
            message: format!("{:#}", e),
        })
}

/// Tabs held in memory, keyed by tab name. The spreadsheet id is ignored:
/// one `MemorySource` is one workbook.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    sheets: HashMap<String, Grid>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: &str, grid: Grid) -> Self {
        self.insert(name, grid);
        self
    }

    pub fn insert(&mut self, name: &str, grid: Grid) {
        self.sheets.insert(name.to_string(), grid);
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sheets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl SheetSource for MemorySource {
    async fn get_range(&self, _spreadsheet_id: &str, sheet: &str, range: &str) -> Result<Grid> {
        let grid = self
            .sheets
            .get(sheet)
            .with_context(|| format!("Unable to parse range: '{}'!{}", sheet, range))?;
        let bounds = CellRange::parse(range)?;
        Ok(slice_grid(grid, &bounds))
    }
}

/// Cut `bounds` out of `grid`, trimming trailing empty cells and rows the
/// way the Sheets API does.
fn slice_grid(grid: &Grid, bounds: &CellRange) -> Grid {
    let last_row = bounds
        .end_row
        .unwrap_or(usize::MAX)
        .min(grid.len().saturating_sub(1));

    let mut out: Grid = Vec::new();
    if grid.is_empty() || bounds.start_row > last_row {
        return out;
    }

    for row in &grid[bounds.start_row..=last_row] {
        let mut cells: Vec<Cell> = row
            .iter()
            .skip(bounds.start_col)
            .take(bounds.width())
            .cloned()
            .collect();
        while cells.last().is_some_and(Cell::is_blank) {
            cells.pop();
        }
        out.push(cells);
    }
    while out.last().is_some_and(Vec::is_empty) {
        out.pop();
    }
    out
}

/// Load every tab of a local `.xlsx/.xls/.ods` workbook into memory, with
/// cells at their absolute positions.
pub fn load_workbook(path: &Path) -> Result<MemorySource> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let mut source = MemorySource::new();
    for name in workbook.sheet_names().to_vec() {
        let range = match workbook.worksheet_range(&name) {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping sheet '{}': {}", name, e);
                continue;
            }
        };

        let (row0, col0) = range.start().unwrap_or((0, 0));
        let mut grid: Grid = vec![Vec::new(); row0 as usize];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; col0 as usize];
            cells.extend(row.iter().map(Cell::from));
            grid.push(cells);
        }
        debug!("Loaded sheet '{}': {} rows", name, grid.len());
        source.insert(&name, grid);
    }

    if source.sheets.is_empty() {
        anyhow::bail!("Workbook {} has no readable sheets", path.display());
    }
    Ok(source)
}
