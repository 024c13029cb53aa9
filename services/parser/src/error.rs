use thiserror::Error;

/// Sheet- and source-level failures. Cell-level problems never surface here,
/// they coerce to 0 / `None` in [`crate::cell`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no month headers found in sheet '{sheet}'")]
    NoMonthHeaders { sheet: String },

    #[error("sheet '{sheet}' has {rows} rows, need at least {needed}")]
    SheetTooShort {
        sheet: String,
        rows: usize,
        needed: usize,
    },

    #[error("could not detect the reporting period: no decodable dates in any tab")]
    PeriodNotDetected,

    #[error("failed to read sheet '{sheet}': {message}")]
    SourceUnavailable { sheet: String, message: String },

    #[error("invalid cell range: {0}")]
    InvalidRange(String),
}

impl ParseError {
    /// Structural problems are scoped to one statement or tab; everything
    /// else means the source as a whole cannot be read.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ParseError::NoMonthHeaders { .. } | ParseError::SheetTooShort { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
