//! Fixed geometry of a per-brand daily tab.
//!
//! Rows and columns are 0-based within `BRAND_TAB_RANGE`. Every channel block
//! has one row per entry of [`RAW_CHANNELS`], in that order.

use std::ops::Range;

use serde::Serialize;

use crate::cell::{cell_at, normalize_label, Grid};

pub const BRAND_TAB_RANGE: &str = "A1:AZ80";

pub const DATE_ROW: usize = 2;
pub const FIRST_DATE_COL: usize = 3;

pub const NET_SALES_BASE: usize = 4;
pub const GROSS_PROFIT_BASE: usize = 15;

const ANCHOR_ROW: usize = 26;
const ANCHOR_COL: usize = 1;

pub const RAW_CHANNELS: [&str; 9] = [
    "Shopee",
    "Tokopedia",
    "TikTok Shop",
    "TikTok Ads",
    "Lazada",
    "Blibli",
    "Website",
    "Reseller",
    "Offline Store",
];

/// Raw channel -> reported channel. Channels not listed report as themselves.
const CHANNEL_MERGE: &[(&str, &str)] = &[
    ("TikTok Shop", "TikTok"),
    ("TikTok Ads", "TikTok"),
    ("Reseller", "Offline"),
    ("Offline Store", "Offline"),
];

pub fn resolve_channel(raw: &'static str) -> &'static str {
    CHANNEL_MERGE
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| *to)
        .unwrap_or(raw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutKind {
    /// Newer tabs: a marketplace admin-fee block sits between gross profit
    /// and marketing.
    WithAdminFee,
    WithoutAdminFee,
}

/// Row positions that move depending on the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOffsets {
    pub admin_fee_base: Option<usize>,
    pub marketing_rows: Range<usize>,
    pub net_after_marketing_base: usize,
}

impl LayoutKind {
    pub fn offsets(self) -> RowOffsets {
        match self {
            LayoutKind::WithAdminFee => RowOffsets {
                admin_fee_base: Some(27),
                marketing_rows: 37..42,
                net_after_marketing_base: 43,
            },
            LayoutKind::WithoutAdminFee => RowOffsets {
                admin_fee_base: None,
                marketing_rows: 27..32,
                net_after_marketing_base: 33,
            },
        }
    }
}

/// Decided once per tab from the heading in the anchor cell.
pub fn detect_layout(grid: &Grid) -> LayoutKind {
    let anchor = normalize_label(&cell_at(grid, ANCHOR_ROW, ANCHOR_COL).as_text());
    if anchor.contains("admin") {
        LayoutKind::WithAdminFee
    } else {
        LayoutKind::WithoutAdminFee
    }
}
