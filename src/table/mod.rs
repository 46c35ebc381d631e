//! Reading and writing of tabular files.
//!
//! Two families of files are supported: delimited text (`.csv`) and spreadsheets (`.xlsx`,
//! `.xlsm`, `.xls`, `.ods` for reading, `.xlsx` for writing). Either way, a file is handled as a
//! sequence of rows of typed `Cell`s.

mod reader;
mod writer;

use crate::error::{FormatError, FormatResult};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

pub use reader::{read, ReadOptions};
pub use writer::{write, OutputRow, WriteMode, WriteOptions};

/// The one timestamp layout that is recognized while reading cells, and that timestamps are
/// written with.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which character separates the integer and fractional part of numbers in a text file.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum DecimalSeparator {
    /// `1234.5`
    #[default]
    Point,
    /// `1234,5`
    Comma,
    /// Either of the above. A point is tried first.
    Either,
}

/// A single typed value of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Number(Decimal),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Text(String::new())
    }
}

impl Cell {
    /// Types a raw text value: a number if it parses as one, otherwise a timestamp if it matches
    /// `TIMESTAMP_FORMAT`, otherwise the text itself.
    pub fn coerce(raw: &str, decimal: DecimalSeparator) -> Cell {
        if let Some(number) = parse_number(raw, decimal) {
            return Cell::Number(number);
        }
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
            return Cell::Timestamp(timestamp);
        }
        Cell::Text(raw.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Text(s) if s.trim().is_empty())
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the cell for a text file.
    pub fn render(&self, decimal: DecimalSeparator) -> String {
        match (self, decimal) {
            (Cell::Number(n), DecimalSeparator::Comma) => n.to_string().replace('.', ","),
            _ => self.to_string(),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Number(n) => Display::fmt(n, f),
            Cell::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(value: NaiveDateTime) -> Self {
        Cell::Timestamp(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

fn parse_number(raw: &str, decimal: DecimalSeparator) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    match decimal {
        DecimalSeparator::Point => parse_point_number(s),
        DecimalSeparator::Comma => parse_comma_number(s),
        DecimalSeparator::Either => parse_point_number(s).or_else(|| parse_comma_number(s)),
    }
}

fn parse_point_number(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

fn parse_comma_number(s: &str) -> Option<Decimal> {
    if s.contains('.') {
        return None;
    }
    parse_point_number(&s.replace(',', "."))
}

/// The two kinds of tabular files.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FileFamily {
    Delimited,
    Spreadsheet,
}

impl FileFamily {
    /// Determines the family from the extension of `path`.
    pub fn from_path(path: &Path) -> FormatResult<Self> {
        match extension(path).as_deref() {
            Some("csv") => Ok(FileFamily::Delimited),
            Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(FileFamily::Spreadsheet),
            other => Err(FormatError::UnsupportedFormat {
                extension: other.unwrap_or_default().to_string(),
            }),
        }
    }
}

/// The lowercase extension of `path`, if it has one.
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}
