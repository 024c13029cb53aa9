//! Spreadsheet ingestion core: turns raw sheet grids into typed rows.
//!
//! Nothing here talks to a database or the network directly. Grids arrive
//! through a [`source::SheetSource`]; the sync service supplies the Google
//! Sheets implementation and writes the results.

pub mod catalog;
pub mod cell;
pub mod error;
pub mod labels;
pub mod months;
pub mod operational;
pub mod range;
pub mod source;
pub mod statements;

pub use catalog::{ProductCatalog, ProductClass, ProductEntry};
pub use cell::{Cell, Grid};
pub use error::{ParseError, Result};
pub use months::CanonicalMonth;
pub use operational::{parse_operational_sheet, OperationalReport, OperationalSheets};
pub use source::{load_workbook, MemorySource, SheetSource};
pub use statements::{parse_financial_report, FinancialReport, FinancialSheets};
