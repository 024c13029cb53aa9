//! Row-label to canonical-field mapping.
//!
//! Lookup order: exact (case/space-insensitive), then bidirectional substring
//! in table order, then a slug of the label itself under section `other`.
//! Table order is therefore a priority list; more specific labels go first.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::cell::{normalize_label, slugify};

/// Section given to labels no table entry matched.
pub const FALLBACK_SECTION: &str = "other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    pub raw_label: String,
    pub key: String,
    pub section: String,
}

struct LabelEntry {
    label: String,
    key: &'static str,
    section: &'static str,
}

/// Ordered list of known labels for one statement.
pub struct LabelTable {
    entries: Vec<LabelEntry>,
}

impl LabelTable {
    /// `(label, key, section)` triples, highest priority first.
    pub fn new(entries: &[(&str, &'static str, &'static str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(label, key, section)| LabelEntry {
                    label: normalize_label(label),
                    key,
                    section,
                })
                .collect(),
        }
    }

    /// Map a raw label. `None` only for blank labels.
    pub fn resolve(&self, raw_label: &str) -> Option<FieldMapping> {
        let label = normalize_label(raw_label);
        if label.is_empty() {
            return None;
        }

        let hit = self
            .entries
            .iter()
            .find(|e| e.label == label)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| label.contains(&e.label) || e.label.contains(&label))
            });

        let mapping = match hit {
            Some(entry) => FieldMapping {
                raw_label: raw_label.trim().to_string(),
                key: entry.key.to_string(),
                section: entry.section.to_string(),
            },
            None => {
                let key = slugify(&label);
                if key.is_empty() {
                    return None;
                }
                FieldMapping {
                    raw_label: raw_label.trim().to_string(),
                    key,
                    section: FALLBACK_SECTION.to_string(),
                }
            }
        };
        Some(mapping)
    }
}

// =============================================================================
// Statement tables
// =============================================================================

pub static PL_LABELS: Lazy<LabelTable> = Lazy::new(|| {
    LabelTable::new(&[
        ("penjualan kotor", "gross_sales", "revenue"),
        ("gross sales", "gross_sales", "revenue"),
        ("diskon penjualan", "sales_discount", "revenue"),
        ("retur penjualan", "sales_return", "revenue"),
        ("penjualan bersih", "net_sales", "revenue"),
        ("net sales", "net_sales", "revenue"),
        ("harga pokok penjualan", "cogs", "cogs"),
        ("hpp", "cogs", "cogs"),
        ("cogs", "cogs", "cogs"),
        ("laba kotor", "gross_profit", "gross_profit"),
        ("gross profit", "gross_profit", "gross_profit"),
        ("biaya admin marketplace", "marketplace_fee", "marketing"),
        ("biaya marketplace", "marketplace_fee", "marketing"),
        ("biaya iklan", "advertising", "marketing"),
        ("advertising", "advertising", "marketing"),
        ("biaya promosi", "promotion", "marketing"),
        ("biaya kol", "kol_endorsement", "marketing"),
        ("total biaya marketing", "total_marketing", "marketing"),
        ("gaji", "salaries", "opex"),
        ("sewa", "rent", "opex"),
        ("listrik", "utilities", "opex"),
        ("ongkos kirim", "shipping", "opex"),
        ("total biaya operasional", "total_opex", "opex"),
        ("biaya operasional", "operating_expense", "opex"),
        ("ebitda", "ebitda", "ebitda"),
        ("penyusutan", "depreciation", "non_operating"),
        ("pendapatan lain", "other_income", "non_operating"),
        ("beban bunga", "interest_expense", "non_operating"),
        ("laba sebelum pajak", "profit_before_tax", "net_profit"),
        ("pajak penghasilan", "income_tax", "tax"),
        ("laba bersih", "net_profit", "net_profit"),
        ("net profit", "net_profit", "net_profit"),
    ])
});

pub static CF_LABELS: Lazy<LabelTable> = Lazy::new(|| {
    LabelTable::new(&[
        ("penerimaan dari pelanggan", "receipts_from_customers", "operating"),
        ("pembayaran kepada pemasok", "payments_to_suppliers", "operating"),
        ("pembayaran uang muka", "advance_payments", "operating"),
        ("pembayaran gaji", "salary_payments", "operating"),
        ("pembayaran pajak", "tax_payments", "operating"),
        ("pembayaran biaya operasional", "operating_expense_payments", "operating"),
        ("kas bersih dari aktivitas operasi", "net_operating_cash_flow", "operating"),
        ("pembelian aset tetap", "capex", "investing"),
        ("penjualan aset tetap", "asset_disposals", "investing"),
        ("kas bersih dari aktivitas investasi", "net_investing_cash_flow", "investing"),
        ("penerimaan pinjaman", "loan_proceeds", "financing"),
        ("pembayaran pinjaman", "loan_repayments", "financing"),
        ("setoran modal", "capital_injection", "financing"),
        ("pembayaran dividen", "dividends_paid", "financing"),
        ("kas bersih dari aktivitas pendanaan", "net_financing_cash_flow", "financing"),
        ("kenaikan (penurunan) kas", "net_change_in_cash", "summary"),
        ("saldo awal kas", "opening_cash", "summary"),
        ("saldo akhir kas", "closing_cash", "summary"),
    ])
});

pub static RATIO_LABELS: Lazy<LabelTable> = Lazy::new(|| {
    LabelTable::new(&[
        ("current ratio", "current_ratio", "liquidity"),
        ("rasio lancar", "current_ratio", "liquidity"),
        ("quick ratio", "quick_ratio", "liquidity"),
        ("rasio cepat", "quick_ratio", "liquidity"),
        ("cash ratio", "cash_ratio", "liquidity"),
        ("gross profit margin", "gross_margin", "profitability"),
        ("margin laba kotor", "gross_margin", "profitability"),
        ("net profit margin", "net_margin", "profitability"),
        ("margin laba bersih", "net_margin", "profitability"),
        ("ebitda margin", "ebitda_margin", "profitability"),
        ("return on equity", "return_on_equity", "profitability"),
        ("return on assets", "return_on_assets", "profitability"),
        ("debt to equity", "debt_to_equity", "leverage"),
        ("debt ratio", "debt_ratio", "leverage"),
        ("inventory turnover", "inventory_turnover", "efficiency"),
        ("perputaran persediaan", "inventory_turnover", "efficiency"),
        ("days inventory", "days_inventory_outstanding", "efficiency"),
        ("cash conversion cycle", "cash_conversion_cycle", "efficiency"),
        ("marketing to sales", "marketing_to_sales", "efficiency"),
    ])
});
