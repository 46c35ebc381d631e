//! Error types.
//!
//! Application code uses the `anyhow` based `Result` alias. The conversion pipeline itself
//! returns `FormatError` so that callers, mainly the dispatcher, can tell a file that a parser
//! rejects apart from a failure that should abort the run.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The result type of the reading, parsing, exporting and writing functions.
pub type FormatResult<T> = std::result::Result<T, FormatError>;

/// How a file header has drifted away from the schema a parser knows.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Drift {
    /// The header has a column the schema does not know.
    Unknown,
    /// The header lacks a column the parser needs.
    Missing,
    /// The header names the same column more than once.
    Duplicate,
}

impl Display for Drift {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Drift::Unknown => f.write_str("unknown to"),
            Drift::Missing => f.write_str("missing for"),
            Drift::Duplicate => f.write_str("repeated in the header for"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The header does not match the schema, so the schema has to be updated.
    #[error(
        "The column '{column}' is {drift} the {format} parser (schema v{version}). \
        The parser has to be updated!"
    )]
    ParserOutdated {
        format: String,
        version: u32,
        column: String,
        drift: Drift,
    },

    /// A row could not be turned into a record. `line` is the 1-based line (or sheet row) in the
    /// source file.
    #[error("Malformed {format} row at line {line}: {reason}")]
    MalformedRow {
        format: String,
        line: usize,
        reason: String,
    },

    #[error("The file format '{extension}' is currently not supported")]
    UnsupportedFormat { extension: String },

    #[error("The format of '{}' is currently not supported by any parser", path.display())]
    UnsupportedFile { path: PathBuf },

    #[error("The {format} format can be read but not written")]
    ExportUnsupported { format: String },

    #[error(
        "Unable to append to '{}' because its header does not match the {format} columns",
        path.display()
    )]
    HeaderMismatch { format: String, path: PathBuf },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to process delimited text: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unable to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Unable to write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl FormatError {
    /// True when the error means "this parser does not accept this file" rather than a failure
    /// that should stop the run.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            FormatError::ParserOutdated { .. } | FormatError::MalformedRow { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FormatError::Io {
            path: path.into(),
            source,
        }
    }
}
