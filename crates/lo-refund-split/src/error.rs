use std::io;

use thiserror::Error;

use crate::model::Row;
use crate::options::PagePolicy;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to write archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("document has no pages")]
    NoPages,

    #[error("no table could be read from page 1")]
    NoTableFound,

    #[error("no header row with a '{label}' column was found on page 1")]
    HeaderNotFound { label: String, preview: Vec<Row> },

    #[error("no rows below the header carry a numeric '{label}' value")]
    NoValidRows { label: String },

    #[error("{policy} mode needs at least {required} pages, document has {actual}")]
    TooFewPages {
        policy: PagePolicy,
        required: usize,
        actual: usize,
    },

    #[error("failed to render summary page: {0}")]
    Render(String),

    #[error("failed to assemble output document: {0}")]
    Assemble(String),
}

impl SplitError {
    /// Raw rows captured for diagnostics, if this error carries any.
    #[must_use]
    pub fn preview(&self) -> Option<&[Row]> {
        match self {
            Self::HeaderNotFound { preview, .. } => Some(preview),
            _ => None,
        }
    }
}
