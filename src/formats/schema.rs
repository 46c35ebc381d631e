use crate::error::{Drift, FormatError, FormatResult};
use crate::formats::row::Row;
use crate::table::{self, Cell, DecimalSeparator, OutputRow, ReadOptions, WriteMode, WriteOptions};
use std::path::Path;
use tracing::{debug, trace};

/// The definition of one tabular file format: its columns and how its files are laid out.
///
/// Each format has exactly one `Schema`. When an exchange changes its export, the schema is
/// updated and its `version` bumped.
#[derive(Debug)]
pub struct Schema {
    /// The format name as used on the command line.
    pub name: &'static str,
    /// The exchange or application that produces or consumes the files.
    pub exchange: &'static str,
    pub version: u32,
    /// Every known column, in the order they are written.
    pub columns: &'static [&'static str],
    /// The columns a file must have to be parsed.
    pub required: &'static [&'static str],
    pub delimiter: u8,
    pub decimal: DecimalSeparator,
    /// Rows that precede the header, e.g. a disclaimer.
    pub leading_rows: usize,
    /// A date layout from older exports that cell typing does not recognize.
    pub legacy_date_format: Option<&'static str>,
    /// Free-form columns, such as ids and addresses, whose text must not be read as a number.
    pub text_columns: &'static [&'static str],
    pub write_mode: WriteMode,
    /// The extension used when an output path has none.
    pub default_extension: &'static str,
}

impl Schema {
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            delimiter: self.delimiter,
            decimal: self.decimal,
            header_row: self.leading_rows,
            text_columns: self.text_columns,
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            delimiter: self.delimiter,
            decimal: self.decimal,
            mode: self.write_mode,
        }
    }

    /// Fails with `ParserOutdated` if `header` has a column this schema does not know, names a
    /// column twice, or lacks one it requires.
    pub fn validate_header<S: AsRef<str>>(&self, header: &[S]) -> FormatResult<()> {
        let names: Vec<&str> = header.iter().map(AsRef::as_ref).collect();
        if let Some(unknown) = names.iter().copied().find(|h| !self.columns.contains(h)) {
            return Err(self.outdated(unknown, Drift::Unknown));
        }
        if let Some((_, repeated)) = names
            .iter()
            .copied()
            .enumerate()
            .find(|(ix, h)| names[..*ix].contains(h))
        {
            return Err(self.outdated(repeated, Drift::Duplicate));
        }
        if let Some(missing) = self.required.iter().find(|r| !names.contains(*r)) {
            return Err(self.outdated(missing, Drift::Missing));
        }
        Ok(())
    }

    fn outdated(&self, column: &str, drift: Drift) -> FormatError {
        FormatError::ParserOutdated {
            format: self.name.to_string(),
            version: self.version,
            column: column.to_string(),
            drift,
        }
    }

    pub(crate) fn malformed(&self, line: usize, reason: impl Into<String>) -> FormatError {
        FormatError::MalformedRow {
            format: self.name.to_string(),
            line,
            reason: reason.into(),
        }
    }

    /// Reads `path`, skips the leading rows, and validates the header. No data row is looked at
    /// before the header has been accepted.
    pub(crate) fn load(&'static self, path: &Path) -> FormatResult<Table> {
        let mut rows = table::read(path, &self.read_options())?
            .into_iter()
            .enumerate()
            .skip(self.leading_rows);

        let header: Vec<String> = match rows.next() {
            Some((_, cells)) => cells.iter().map(Cell::to_string).collect(),
            None => {
                return Err(self.malformed(self.leading_rows + 1, "the file has no header row"))
            }
        };
        self.validate_header(&header)?;
        debug!("The {} parser accepts the header of {}", self.name, path.display());

        let rows = rows
            .filter(|(ix, cells)| {
                let blank = cells.iter().all(Cell::is_empty);
                if blank {
                    trace!("Skipping blank line {}", ix + 1);
                }
                !blank
            })
            .map(|(ix, cells)| (ix + 1, cells))
            .collect();

        Ok(Table {
            schema: self,
            header,
            rows,
        })
    }

    /// Writes `rows` to `path` with this schema's columns and write settings.
    pub(crate) fn write(&self, rows: &[OutputRow], path: &Path) -> FormatResult<()> {
        table::write(rows, path, self.columns, self.name, &self.write_options())
    }
}

/// The validated content of a file: its header and its data rows with their line numbers.
#[derive(Debug)]
pub(crate) struct Table {
    schema: &'static Schema,
    header: Vec<String>,
    rows: Vec<(usize, Vec<Cell>)>,
}

impl Table {
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Binds each data row to the header.
    pub(crate) fn rows(&self) -> impl Iterator<Item = FormatResult<Row<'_>>> {
        self.rows
            .iter()
            .map(|(line, cells)| Row::bind(self.schema, *line, &self.header, cells))
    }
}
