//! Cash-flow statement.
//!
//! Generic labels such as "Inventory" or "Lainnya" appear under several
//! parent headings, so the scan carries a [`CfContext`] (current top-level
//! flow and current parent heading) from row to row and prefixes those
//! labels with the parent's slug.

use log::debug;
use serde::Serialize;

use super::{month_columns, StatementLayout};
use crate::cell::{cell_at, normalize_label, slugify, to_number, Grid};
use crate::error::Result;
use crate::labels::{FieldMapping, CF_LABELS, FALLBACK_SECTION};
use crate::months::{CanonicalMonth, MonthColumn};

const TOP_LEVEL_COL: usize = 1;
const INDENTED_COL: usize = 2;

/// Labels that recur under different parents and must not collide.
const AMBIGUOUS_LABELS: &[&str] = &[
    "inventory",
    "persediaan",
    "packaging",
    "lainnya",
    "lain-lain",
    "lain lain",
    "others",
    "other",
];

/// Parent heading fragments and the slug they contribute, in priority order.
const PARENT_ALIASES: &[(&str, &str)] = &[
    ("uang muka", "uang_muka"),
    ("pemasok", "pemasok"),
    ("supplier", "pemasok"),
    ("biaya operasional", "operasional"),
    ("aset tetap", "aset_tetap"),
    ("pinjaman", "pinjaman"),
];

const FLOW_HEADER_PREFIX: &str = "arus kas dari";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CfRow {
    pub month: CanonicalMonth,
    pub line_item: String,
    pub line_item_label: String,
    pub section: String,
    pub sub_section: Option<String>,
    pub amount: f64,
}

/// Row-to-row state of one CF scan. Starts empty for every parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CfContext {
    pub section: Option<String>,
    pub parent: Option<String>,
}

impl CfContext {
    /// Context after seeing one labelled row.
    pub fn observe(&self, label: &str, top_level: bool, is_header: bool) -> CfContext {
        let norm = normalize_label(label);

        if let Some(flow) = norm.strip_prefix(FLOW_HEADER_PREFIX) {
            return CfContext {
                section: Some(flow_section(flow)),
                parent: None,
            };
        }

        let known_parent = parent_alias(&norm);
        if top_level && (is_header || known_parent.is_some()) {
            return CfContext {
                section: self.section.clone(),
                parent: Some(known_parent.map(str::to_string).unwrap_or_else(|| slugify(&norm))),
            };
        }

        self.clone()
    }

    /// Map a data-row label in this context.
    pub fn resolve(&self, raw_label: &str) -> Option<FieldMapping> {
        let norm = normalize_label(raw_label);
        if AMBIGUOUS_LABELS.contains(&norm.as_str()) {
            let base = slugify(&norm);
            let key = match &self.parent {
                Some(parent) => format!("{}_{}", parent, base),
                None => base,
            };
            return Some(FieldMapping {
                raw_label: raw_label.trim().to_string(),
                key,
                section: self.fallback_section(),
            });
        }

        CF_LABELS.resolve(raw_label).map(|mut mapping| {
            if mapping.section == FALLBACK_SECTION {
                mapping.section = self.fallback_section();
            }
            mapping
        })
    }

    fn fallback_section(&self) -> String {
        self.section
            .clone()
            .unwrap_or_else(|| FALLBACK_SECTION.to_string())
    }
}

fn flow_section(rest: &str) -> String {
    if rest.contains("operasi") {
        "operating".to_string()
    } else if rest.contains("investasi") {
        "investing".to_string()
    } else if rest.contains("pendanaan") {
        "financing".to_string()
    } else {
        slugify(rest)
    }
}

fn parent_alias(norm: &str) -> Option<&'static str> {
    PARENT_ALIASES
        .iter()
        .find(|(fragment, _)| norm.contains(fragment))
        .map(|(_, slug)| *slug)
}

/// One row of the scan: the next context plus whatever the row emits.
fn scan_row(
    ctx: CfContext,
    grid: &Grid,
    r: usize,
    months: &[MonthColumn],
) -> (CfContext, Vec<CfRow>) {
    let indented = cell_at(grid, r, INDENTED_COL).as_text();
    let (label, top_level) = if !indented.is_empty() {
        (indented, false)
    } else {
        (cell_at(grid, r, TOP_LEVEL_COL).as_text(), true)
    };
    if label.is_empty() {
        return (ctx, Vec::new());
    }

    let is_header = cell_at(grid, r, months[0].col).is_blank();
    let ctx = ctx.observe(&label, top_level, is_header);
    if is_header {
        return (ctx, Vec::new());
    }

    let Some(mapping) = ctx.resolve(&label) else {
        return (ctx, Vec::new());
    };
    let rows = months
        .iter()
        .map(|mc| CfRow {
            month: mc.month,
            line_item: mapping.key.clone(),
            line_item_label: mapping.raw_label.clone(),
            section: mapping.section.clone(),
            sub_section: ctx.parent.clone(),
            amount: to_number(cell_at(grid, r, mc.col)),
        })
        .collect();
    (ctx, rows)
}

pub fn parse_cf(grid: &Grid, layout: &StatementLayout) -> Result<Vec<CfRow>> {
    let months = month_columns(grid, layout)?;

    let (_, rows) = (layout.data_start_row..grid.len()).fold(
        (CfContext::default(), Vec::new()),
        |(ctx, mut acc), r| {
            let (next, emitted) = scan_row(ctx, grid, r, &months);
            acc.extend(emitted);
            (next, acc)
        },
    );

    debug!(
        "CF: {} month columns, {} rows from sheet '{}'",
        months.len(),
        rows.len(),
        layout.sheet
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    /// Header on row 3, months from column D, body below.
    fn grid(body: Vec<Vec<Cell>>) -> Grid {
        let mut g = vec![
            vec![],
            vec![],
            vec![],
            vec![
                Cell::Empty,
                text("Keterangan"),
                Cell::Empty,
                text("Nov 2025"),
                text("Dec 2025"),
            ],
        ];
        g.extend(body);
        g
    }

    fn top(label: &str, values: &[f64]) -> Vec<Cell> {
        let mut row = vec![Cell::Empty, text(label), Cell::Empty];
        row.extend(values.iter().map(|v| num(*v)));
        row
    }

    fn indented(label: &str, values: &[f64]) -> Vec<Cell> {
        let mut row = vec![Cell::Empty, Cell::Empty, text(label)];
        row.extend(values.iter().map(|v| num(*v)));
        row
    }

    fn keys(rows: &[CfRow]) -> Vec<&str> {
        let mut keys: Vec<&str> = rows.iter().map(|r| r.line_item.as_str()).collect();
        keys.dedup();
        keys
    }

    #[test]
    fn test_ambiguous_labels_take_parent_prefix() {
        let g = grid(vec![
            top("ARUS KAS DARI AKTIVITAS OPERASI", &[]),
            top("Pembayaran Uang Muka", &[]),
            indented("Inventory", &[100.0, 110.0]),
            top("Pembayaran Kepada Pemasok", &[]),
            indented("Inventory", &[200.0, 220.0]),
        ]);

        let rows = parse_cf(&g, &StatementLayout::cf("CF")).unwrap();
        assert_eq!(keys(&rows), vec!["uang_muka_inventory", "pemasok_inventory"]);
        assert_eq!(rows[0].sub_section.as_deref(), Some("uang_muka"));
        assert_eq!(rows[0].section, "operating");
        assert_eq!(rows[2].amount, 200.0);
        assert_eq!(rows[2].sub_section.as_deref(), Some("pemasok"));
    }

    #[test]
    fn test_flow_header_clears_parent() {
        let g = grid(vec![
            top("ARUS KAS DARI AKTIVITAS OPERASI", &[]),
            top("Pembayaran Uang Muka", &[]),
            indented("Lainnya", &[1.0, 1.0]),
            top("ARUS KAS DARI AKTIVITAS INVESTASI", &[]),
            indented("Lainnya", &[2.0, 2.0]),
        ]);

        let rows = parse_cf(&g, &StatementLayout::cf("CF")).unwrap();
        assert_eq!(keys(&rows), vec!["uang_muka_lainnya", "lainnya"]);
        assert_eq!(rows[2].section, "investing");
        assert_eq!(rows[2].sub_section, None);
    }

    #[test]
    fn test_known_labels_keep_table_section() {
        let g = grid(vec![
            top("ARUS KAS DARI AKTIVITAS PENDANAAN", &[]),
            top("Penerimaan Pinjaman", &[50.0, 0.0]),
            top("Saldo Akhir Kas", &[500.0, 550.0]),
        ]);

        let rows = parse_cf(&g, &StatementLayout::cf("CF")).unwrap();
        assert_eq!(keys(&rows), vec!["loan_proceeds", "closing_cash"]);
        assert_eq!(rows[0].section, "financing");
        assert_eq!(rows[2].section, "summary");
        // "pinjaman" is a parent alias, so the row also becomes the parent
        assert_eq!(rows[0].sub_section.as_deref(), Some("pinjaman"));
    }

    #[test]
    fn test_unknown_labels_take_flow_section() {
        let g = grid(vec![
            top("ARUS KAS DARI AKTIVITAS INVESTASI", &[]),
            indented("Akuisisi Gudang Baru", &[7.0, 8.0]),
        ]);

        let rows = parse_cf(&g, &StatementLayout::cf("CF")).unwrap();
        assert_eq!(rows[0].line_item, "akuisisi_gudang_baru");
        assert_eq!(rows[0].section, "investing");
    }

    #[test]
    fn test_context_does_not_leak_between_parses() {
        let with_parent = grid(vec![
            top("Pembayaran Uang Muka", &[]),
            indented("Inventory", &[1.0, 1.0]),
        ]);
        let without_parent = grid(vec![indented("Inventory", &[1.0, 1.0])]);

        let layout = StatementLayout::cf("CF");
        let first = parse_cf(&with_parent, &layout).unwrap();
        let second = parse_cf(&without_parent, &layout).unwrap();
        assert_eq!(first[0].line_item, "uang_muka_inventory");
        assert_eq!(second[0].line_item, "inventory");
        assert_eq!(second[0].section, FALLBACK_SECTION);
    }

    #[test]
    fn test_observe_unrecognised_top_level_header_uses_slug() {
        let ctx = CfContext::default().observe("Pembayaran Marketing", true, true);
        assert_eq!(ctx.parent.as_deref(), Some("pembayaran_marketing"));

        // indented headers and plain data rows leave the parent alone
        let same = ctx.observe("Sub judul", false, true);
        assert_eq!(same, ctx);
        let same = ctx.observe("Penerimaan dari Pelanggan", true, false);
        assert_eq!(same, ctx);
    }
}
