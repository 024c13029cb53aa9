//! Parser CLI - runs the sheet parsers against a local workbook
//!
//! Loads an `.xlsx/.xls/.ods` export of a financial or operational
//! spreadsheet, parses it exactly as the sync service would and prints what
//! came out. Nothing is written to a database; `--out-dir` exports the typed
//! rows as CSV and `--json` dumps the whole report.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};

use sheets_parser::cell::to_iso;
use sheets_parser::{
    load_workbook, parse_financial_report, parse_operational_sheet, FinancialReport,
    FinancialSheets, OperationalReport, OperationalSheets, ProductCatalog, ProductEntry,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Financial,
    Operational,
}

#[derive(Parser, Debug)]
#[command(name = "parser", about = "Parses a local spreadsheet export into typed rows")]
struct Args {
    /// Workbook to read (.xlsx, .xls or .ods)
    #[arg(long)]
    file: PathBuf,

    /// Which kind of spreadsheet this is
    #[arg(long, value_enum)]
    kind: Kind,

    /// PL tab name
    #[arg(long, default_value = "PL")]
    pl_sheet: String,

    /// CF tab name
    #[arg(long, default_value = "CF")]
    cf_sheet: String,

    /// Ratios tab name
    #[arg(long, default_value = "Ratios")]
    ratios_sheet: String,

    /// Brand tab to parse (repeatable)
    #[arg(long = "brand-tab")]
    brand_tabs: Vec<String>,

    /// Ads tab name
    #[arg(long)]
    ads_tab: Option<String>,

    /// Product catalog as a JSON array of {product_name, brand, product_type}
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Write one CSV per row type into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long, default_value = "false")]
    json: bool,
}

fn write_csv<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<()> {
    let path = dir.join(format!("{}.csv", name));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    println!("  Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<ProductCatalog> {
    let Some(path) = path else {
        return Ok(ProductCatalog::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let entries: Vec<ProductEntry> =
        serde_json::from_str(&content).context("Failed to parse catalog JSON")?;
    Ok(ProductCatalog::new(entries))
}

fn print_financial(report: &FinancialReport) {
    let months: Vec<String> = report
        .months_found
        .iter()
        .map(|m| to_iso(m.first_day()))
        .collect();
    println!("Months found: {}", months.join(", "));
    println!("PL rows:     {}", report.pl.len());
    println!("CF rows:     {}", report.cf.len());
    println!("Ratio rows:  {}", report.ratios.len());

    for row in report.pl.iter().take(3) {
        println!(
            "  [PL] {} | {} | {} | {:.2}",
            row.month, row.section, row.line_item, row.amount
        );
    }

    if !report.errors.is_empty() {
        println!("\nStatement errors ({}):", report.errors.len());
        for (i, err) in report.errors.iter().enumerate() {
            println!("  [{}] {}", i + 1, err);
        }
    }
}

fn print_operational(report: &OperationalReport) {
    println!("Period:            {}", to_iso(report.period.first_day()));
    println!("Daily channel:     {}", report.daily_channel.len());
    println!("Daily product:     {}", report.daily_product.len());
    println!("Ads rows:          {}", report.ads.len());
    println!("Monthly summaries: {}", report.monthly_summary.len());

    for s in &report.monthly_summary {
        println!(
            "  {} | {} ({}) | sales {:.0} | profit {:.0} | {} active days",
            s.period, s.product, s.brand, s.net_sales, s.gross_profit, s.active_days
        );
    }

    if !report.warnings.is_empty() {
        println!("\nWarnings ({}):", report.warnings.len());
        for w in &report.warnings {
            println!("  - {}", w);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    println!("=== Sheets Parser ===");
    println!("File: {}", args.file.display());
    println!("Kind: {:?}", args.kind);

    let source = load_workbook(&args.file)?;
    println!("Tabs: {}", source.sheet_names().join(", "));

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    // a local workbook has no spreadsheet id
    let spreadsheet_id = args.file.display().to_string();

    match args.kind {
        Kind::Financial => {
            let sheets = FinancialSheets {
                pl: args.pl_sheet.clone(),
                cf: args.cf_sheet.clone(),
                ratios: args.ratios_sheet.clone(),
            };
            let report = parse_financial_report(&source, &spreadsheet_id, &sheets).await;
            print_financial(&report);

            if let Some(dir) = &args.out_dir {
                write_csv(dir, "financial_pl", &report.pl)?;
                write_csv(dir, "financial_cf", &report.cf)?;
                write_csv(dir, "financial_ratios", &report.ratios)?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            if report.row_count() == 0 {
                anyhow::bail!("No rows parsed from {}", args.file.display());
            }
        }
        Kind::Operational => {
            let catalog = load_catalog(args.catalog.as_deref())?;
            let sheets = OperationalSheets {
                brand_tabs: args.brand_tabs.clone(),
                ads_tab: args.ads_tab.clone(),
            };
            let report = parse_operational_sheet(&source, &spreadsheet_id, &sheets, &catalog)
                .await
                .context("Operational sheet could not be parsed")?;
            print_operational(&report);

            if let Some(dir) = &args.out_dir {
                write_csv(dir, "daily_channel", &report.daily_channel)?;
                write_csv(dir, "daily_product", &report.daily_product)?;
                write_csv(dir, "daily_ads", &report.ads)?;
                write_csv(dir, "monthly_summary", &report.monthly_summary)?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
    }

    Ok(())
}
