//! Daily operational sheets: one tab per brand/product with a column per
//! day, plus an optional ads tab.

pub mod ads;
pub mod layout;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::catalog::{ProductCatalog, ProductClass};
use crate::cell::{cell_at, decode_date, to_number, Grid};
use crate::error::{ParseError, Result};
use crate::months::CanonicalMonth;
use crate::source::{fetch, SheetSource};

pub use ads::{parse_ads, DailyAdsRecord};
pub use layout::{detect_layout, resolve_channel, LayoutKind, RowOffsets, RAW_CHANNELS};

use layout::{BRAND_TAB_RANGE, DATE_ROW, FIRST_DATE_COL, GROSS_PROFIT_BASE, NET_SALES_BASE};

/// Which tabs of an operational spreadsheet to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationalSheets {
    pub brand_tabs: Vec<String>,
    pub ads_tab: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyChannelRecord {
    pub date: NaiveDate,
    pub product: String,
    pub brand: String,
    pub channel: String,
    pub net_sales: f64,
    pub gross_profit: f64,
    pub marketplace_admin_cost: f64,
    pub net_after_marketing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyProductSummary {
    pub date: NaiveDate,
    pub product: String,
    pub brand: String,
    pub net_sales: f64,
    pub gross_profit: f64,
    pub marketplace_admin_cost: f64,
    pub marketing_cost: f64,
    pub net_after_marketing: f64,
}

impl DailyProductSummary {
    fn has_activity(&self) -> bool {
        [
            self.net_sales,
            self.gross_profit,
            self.marketplace_admin_cost,
            self.marketing_cost,
            self.net_after_marketing,
        ]
        .iter()
        .any(|v| *v != 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub period: CanonicalMonth,
    pub product: String,
    pub brand: String,
    pub net_sales: f64,
    pub gross_profit: f64,
    pub marketplace_admin_cost: f64,
    pub marketing_cost: f64,
    pub net_after_marketing: f64,
    pub active_days: u32,
}

#[derive(Debug, Serialize)]
pub struct OperationalReport {
    pub period: CanonicalMonth,
    pub daily_product: Vec<DailyProductSummary>,
    pub daily_channel: Vec<DailyChannelRecord>,
    pub ads: Vec<DailyAdsRecord>,
    pub monthly_summary: Vec<MonthlySummary>,
    pub warnings: Vec<String>,
}

/// Everything one brand tab produced.
#[derive(Debug, Default)]
pub struct BrandTab {
    pub layout: Option<LayoutKind>,
    pub dates: Vec<NaiveDate>,
    pub channels: Vec<DailyChannelRecord>,
    pub products: Vec<DailyProductSummary>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ChannelTotals {
    net_sales: f64,
    gross_profit: f64,
    admin: f64,
    net_after_marketing: f64,
}

/// Parse one brand tab. Date columns that do not decode are skipped whole.
pub fn parse_brand_tab(
    grid: &Grid,
    sheet: &str,
    product: &str,
    class: &ProductClass,
) -> Result<BrandTab> {
    let date_row = grid.get(DATE_ROW).ok_or_else(|| ParseError::SheetTooShort {
        sheet: sheet.to_string(),
        rows: grid.len(),
        needed: DATE_ROW + 1,
    })?;

    let kind = detect_layout(grid);
    let offsets = kind.offsets();
    let mut tab = BrandTab {
        layout: Some(kind),
        ..BrandTab::default()
    };

    for col in FIRST_DATE_COL..date_row.len() {
        let Some(date) = decode_date(&date_row[col]) else {
            continue;
        };
        tab.dates.push(date);

        // merged channels in first-seen order
        let mut merged: Vec<(&'static str, ChannelTotals)> = Vec::new();
        for (i, raw) in RAW_CHANNELS.into_iter().enumerate() {
            let channel = resolve_channel(raw);
            let idx = match merged.iter().position(|(c, _)| *c == channel) {
                Some(idx) => idx,
                None => {
                    merged.push((channel, ChannelTotals::default()));
                    merged.len() - 1
                }
            };
            let t = &mut merged[idx].1;
            t.net_sales += to_number(cell_at(grid, NET_SALES_BASE + i, col));
            t.gross_profit += to_number(cell_at(grid, GROSS_PROFIT_BASE + i, col));
            if let Some(base) = offsets.admin_fee_base {
                t.admin += to_number(cell_at(grid, base + i, col));
            }
            t.net_after_marketing += to_number(cell_at(grid, offsets.net_after_marketing_base + i, col));
        }

        for (channel, t) in &merged {
            if t.net_sales == 0.0 && t.gross_profit == 0.0 {
                continue;
            }
            tab.channels.push(DailyChannelRecord {
                date,
                product: product.to_string(),
                brand: class.brand.clone(),
                channel: channel.to_string(),
                net_sales: t.net_sales,
                gross_profit: t.gross_profit,
                marketplace_admin_cost: t.admin,
                net_after_marketing: t.net_after_marketing,
            });
        }

        let marketing_cost: f64 = offsets
            .marketing_rows
            .clone()
            .map(|r| to_number(cell_at(grid, r, col)))
            .sum();
        let summary = DailyProductSummary {
            date,
            product: product.to_string(),
            brand: class.brand.clone(),
            net_sales: merged.iter().map(|(_, t)| t.net_sales).sum(),
            gross_profit: merged.iter().map(|(_, t)| t.gross_profit).sum(),
            marketplace_admin_cost: merged.iter().map(|(_, t)| t.admin).sum(),
            marketing_cost,
            net_after_marketing: merged.iter().map(|(_, t)| t.net_after_marketing).sum(),
        };
        if summary.has_activity() {
            tab.products.push(summary);
        }
    }

    Ok(tab)
}

/// The month seen most often; ties go to the earliest month.
pub fn detect_period<'a>(dates: impl IntoIterator<Item = &'a NaiveDate>) -> Result<CanonicalMonth> {
    let mut counts: BTreeMap<CanonicalMonth, usize> = BTreeMap::new();
    for date in dates {
        *counts.entry(CanonicalMonth::from_date(*date)).or_default() += 1;
    }

    // BTreeMap iterates in month order, so keeping the first maximum picks the earliest
    let mut best: Option<(CanonicalMonth, usize)> = None;
    for (month, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((month, count));
        }
    }
    best.map(|(month, _)| month)
        .ok_or(ParseError::PeriodNotDetected)
}

pub fn summarize_monthly(products: &[DailyProductSummary]) -> Vec<MonthlySummary> {
    let mut by_key: BTreeMap<(CanonicalMonth, String), MonthlySummary> = BTreeMap::new();
    for p in products {
        let period = CanonicalMonth::from_date(p.date);
        let entry = by_key
            .entry((period, p.product.clone()))
            .or_insert_with(|| MonthlySummary {
                period,
                product: p.product.clone(),
                brand: p.brand.clone(),
                net_sales: 0.0,
                gross_profit: 0.0,
                marketplace_admin_cost: 0.0,
                marketing_cost: 0.0,
                net_after_marketing: 0.0,
                active_days: 0,
            });
        entry.net_sales += p.net_sales;
        entry.gross_profit += p.gross_profit;
        entry.marketplace_admin_cost += p.marketplace_admin_cost;
        entry.marketing_cost += p.marketing_cost;
        entry.net_after_marketing += p.net_after_marketing;
        entry.active_days += 1;
    }
    by_key.into_values().collect()
}

/// Read every configured brand tab and the ads tab of one spreadsheet.
///
/// A tab that cannot be fetched fails the whole source. A tab too short to
/// hold the date row is skipped and noted in `warnings`. The monthly summary
/// only covers the detected period; days spilling into a neighbouring month
/// stay in the daily rows.
pub async fn parse_operational_sheet<S: SheetSource + ?Sized>(
    source: &S,
    spreadsheet_id: &str,
    sheets: &OperationalSheets,
    catalog: &ProductCatalog,
) -> Result<OperationalReport> {
    let mut warnings = Vec::new();
    let mut dates = Vec::new();
    let mut daily_channel = Vec::new();
    let mut daily_product = Vec::new();

    for tab in &sheets.brand_tabs {
        let grid = fetch(source, spreadsheet_id, tab, BRAND_TAB_RANGE).await?;
        let class = catalog.classify(tab);
        match parse_brand_tab(&grid, tab, tab, &class) {
            Ok(parsed) => {
                info!(
                    "{}: {:?}, {} dates, {} channel rows, brand {}",
                    tab,
                    parsed.layout,
                    parsed.dates.len(),
                    parsed.channels.len(),
                    class.brand
                );
                dates.extend(parsed.dates);
                daily_channel.extend(parsed.channels);
                daily_product.extend(parsed.products);
            }
            Err(e) if e.is_structural() => {
                warn!("{}: skipped ({})", tab, e);
                warnings.push(format!("{}: {}", tab, e));
            }
            Err(e) => return Err(e),
        }
    }

    let ads = match &sheets.ads_tab {
        Some(tab) => {
            let grid = fetch(source, spreadsheet_id, tab, ads::ADS_TAB_RANGE).await?;
            let ads = parse_ads(&grid);
            info!("{}: {} ads rows", tab, ads.len());
            ads
        }
        None => Vec::new(),
    };

    // the ads tab carries a long history, so it only decides when no brand tab has dates
    let period = detect_period(&dates).or_else(|_| detect_period(ads.iter().map(|a| &a.date)))?;
    let in_period: Vec<DailyProductSummary> = daily_product
        .iter()
        .filter(|p| CanonicalMonth::from_date(p.date) == period)
        .cloned()
        .collect();
    let monthly_summary = summarize_monthly(&in_period);

    Ok(OperationalReport {
        period,
        daily_product,
        daily_channel,
        ads,
        monthly_summary,
        warnings,
    })
}
