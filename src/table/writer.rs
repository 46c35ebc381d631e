use crate::error::{FormatError, FormatResult};
use crate::table::{extension, Cell, DecimalSeparator, FileFamily};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Workbook, XlsxError};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// One output row, keyed by column name. Columns that are absent are written empty.
pub type OutputRow = BTreeMap<&'static str, Cell>;

/// What happens to a file that already exists at the output path.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum WriteMode {
    /// Replace the file. Nothing is replaced unless the whole write succeeds.
    #[default]
    Truncate,
    /// Add rows to the end of a delimited text file, writing the header only if the file is new.
    /// Spreadsheets are always replaced.
    Append,
}

/// Settings for writing. Spreadsheets ignore the delimiter and decimal separator.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct WriteOptions {
    pub delimiter: u8,
    pub decimal: DecimalSeparator,
    pub mode: WriteMode,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            decimal: DecimalSeparator::Point,
            mode: WriteMode::Truncate,
        }
    }
}

/// Writes a header made of `columns` followed by `rows`, in order, to `path`. `format` names the
/// format being written and is only used in error messages.
pub fn write(
    rows: &[OutputRow],
    path: &Path,
    columns: &[&'static str],
    format: &str,
    options: &WriteOptions,
) -> FormatResult<()> {
    match (FileFamily::from_path(path)?, options.mode) {
        (FileFamily::Delimited, WriteMode::Append) => {
            append_delimited(rows, path, columns, format, options)?
        }
        (FileFamily::Delimited, WriteMode::Truncate) => {
            replace(path, |tmp| write_delimited(rows, tmp, columns, options))?
        }
        (FileFamily::Spreadsheet, mode) => {
            if extension(path).as_deref() != Some("xlsx") {
                return Err(FormatError::UnsupportedFormat {
                    extension: extension(path).unwrap_or_default(),
                });
            }
            if mode == WriteMode::Append {
                debug!("Spreadsheets cannot be appended to, replacing {}", path.display());
            }
            replace(path, |tmp| write_spreadsheet(rows, tmp, columns))?
        }
    }
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Runs `write_to` against a sibling temporary file and moves it over `path` once it succeeded.
fn replace<F>(path: &Path, write_to: F) -> FormatResult<()>
where
    F: FnOnce(&Path) -> FormatResult<()>,
{
    let tmp = partial_path(path);
    if let Err(e) = write_to(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path).map_err(|e| FormatError::io(path, e))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_delimited(
    rows: &[OutputRow],
    path: &Path,
    columns: &[&'static str],
    options: &WriteOptions,
) -> FormatResult<()> {
    let file = File::create(path).map_err(|e| FormatError::io(path, e))?;
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(file);
    wtr.write_record(columns)?;
    write_records(&mut wtr, rows, columns, options)?;
    wtr.flush().map_err(|e| FormatError::io(path, e))
}

fn append_delimited(
    rows: &[OutputRow],
    path: &Path,
    columns: &[&'static str],
    format: &str,
    options: &WriteOptions,
) -> FormatResult<()> {
    let has_content = std::fs::metadata(path)
        .map(|m| m.len() > 0)
        .unwrap_or(false);

    if has_content {
        let existing = existing_header(path, options.delimiter)?;
        if existing.iter().map(String::as_str).ne(columns.iter().copied()) {
            return Err(FormatError::HeaderMismatch {
                format: format.to_string(),
                path: path.to_path_buf(),
            });
        }
        trace!("Appending to existing file {}", path.display());
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| FormatError::io(path, e))?;
    if has_content && !ends_with_newline(path)? {
        trace!("Terminating the last line of {}", path.display());
        file.write_all(b"\n").map_err(|e| FormatError::io(path, e))?;
    }
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(file);
    if !has_content {
        wtr.write_record(columns)?;
    }
    write_records(&mut wtr, rows, columns, options)?;
    wtr.flush().map_err(|e| FormatError::io(path, e))
}

/// Whether the last byte of the file at `path` is a line feed.
fn ends_with_newline(path: &Path) -> FormatResult<bool> {
    let mut file = File::open(path).map_err(|e| FormatError::io(path, e))?;
    if file.seek(SeekFrom::End(0)).map_err(|e| FormatError::io(path, e))? == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))
        .and_then(|_| file.read_exact(&mut last))
        .map_err(|e| FormatError::io(path, e))?;
    Ok(last[0] == b'\n')
}

fn existing_header(path: &Path, delimiter: u8) -> FormatResult<Vec<String>> {
    let file = File::open(path).map_err(|e| FormatError::io(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(file);
    match rdr.records().next() {
        Some(record) => Ok(record?
            .iter()
            .map(|s| s.trim_start_matches('\u{feff}').to_string())
            .collect()),
        None => Ok(Vec::new()),
    }
}

fn write_records<W: Write>(
    wtr: &mut csv::Writer<W>,
    rows: &[OutputRow],
    columns: &[&'static str],
    options: &WriteOptions,
) -> FormatResult<()> {
    for row in rows {
        let record = columns.iter().map(|column| {
            row.get(column)
                .map(|cell| cell.render(options.decimal))
                .unwrap_or_default()
        });
        wtr.write_record(record)?;
    }
    Ok(())
}

fn write_spreadsheet(
    rows: &[OutputRow],
    path: &Path,
    columns: &[&'static str],
) -> FormatResult<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("sheet1")?;

    for (col, header) in columns.iter().enumerate() {
        sheet.write_string(0, col_index(col)?, *header)?;
    }

    for (ix, row) in rows.iter().enumerate() {
        let sheet_row = u32::try_from(ix + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, column) in columns.iter().enumerate() {
            let col = col_index(col)?;
            match row.get(column) {
                Some(Cell::Number(n)) => match n.to_f64() {
                    Some(f) => sheet.write_number(sheet_row, col, f)?,
                    None => sheet.write_string(sheet_row, col, n.to_string())?,
                },
                Some(cell) if !cell.is_empty() => {
                    sheet.write_string(sheet_row, col, cell.to_string())?
                }
                _ => continue,
            };
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn col_index(col: usize) -> FormatResult<u16> {
    Ok(u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)?)
}
