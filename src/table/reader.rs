use crate::error::{FormatError, FormatResult};
use crate::table::{Cell, DecimalSeparator, FileFamily};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDateTime;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// Settings for reading. Spreadsheets ignore the delimiter.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReadOptions {
    pub delimiter: u8,
    pub decimal: DecimalSeparator,
    /// The 0-based row holding the header.
    pub header_row: usize,
    /// Columns whose text is kept as is below the header instead of being typed, e.g. ids.
    pub text_columns: &'static [&'static str],
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            decimal: DecimalSeparator::Point,
            header_row: 0,
            text_columns: &[],
        }
    }
}

impl ReadOptions {
    /// The positions of `text_columns` in `header`.
    fn text_positions<'a>(&self, header: impl Iterator<Item = &'a str>) -> Vec<usize> {
        header
            .enumerate()
            .filter(|(_, name)| self.text_columns.contains(&name.trim()))
            .map(|(ix, _)| ix)
            .collect()
    }
}

/// Reads the whole file at `path` into rows of typed cells. For spreadsheets only the first sheet
/// is read.
pub fn read(path: &Path, options: &ReadOptions) -> FormatResult<Vec<Vec<Cell>>> {
    let rows = match FileFamily::from_path(path)? {
        FileFamily::Delimited => read_delimited(path, options)?,
        FileFamily::Spreadsheet => read_spreadsheet(path, options)?,
    };
    trace!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn read_delimited(path: &Path, options: &ReadOptions) -> FormatResult<Vec<Vec<Cell>>> {
    let file = File::open(path).map_err(|e| FormatError::io(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(BufReader::new(file));

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut text_positions = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row_ix = rows.len();
        // A byte order mark sticks to the very first field.
        let fields: Vec<&str> = record
            .iter()
            .enumerate()
            .map(|(ix, field)| {
                if row_ix == 0 && ix == 0 {
                    field.trim_start_matches('\u{feff}')
                } else {
                    field
                }
            })
            .collect();
        if row_ix == options.header_row {
            text_positions = options.text_positions(fields.iter().copied());
        }
        let below_header = row_ix > options.header_row;
        let row = fields
            .into_iter()
            .enumerate()
            .map(|(ix, field)| {
                if below_header && text_positions.contains(&ix) {
                    Cell::Text(field.to_string())
                } else {
                    Cell::coerce(field, options.decimal)
                }
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn read_spreadsheet(path: &Path, options: &ReadOptions) -> FormatResult<Vec<Vec<Cell>>> {
    if !path.is_file() {
        return Err(FormatError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        ));
    }
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Vec::new()),
    };

    // The range starts at the first used cell. Pad it so that row and column positions match
    // the sheet.
    let (row_offset, col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or_default();

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    let mut text_positions = Vec::new();
    for sheet_row in range.rows() {
        let row_ix = rows.len();
        if row_ix == options.header_row {
            let names: Vec<String> = sheet_row.iter().map(Data::to_string).collect();
            text_positions = options
                .text_positions(names.iter().map(String::as_str))
                .into_iter()
                .map(|ix| ix + col_offset)
                .collect();
        }
        let below_header = row_ix > options.header_row;
        let mut row = vec![Cell::default(); col_offset];
        row.extend(sheet_row.iter().enumerate().map(|(ix, data)| match data {
            Data::String(s) if below_header && text_positions.contains(&(ix + col_offset)) => {
                Cell::Text(s.clone())
            }
            _ => data_to_cell(data, options.decimal),
        }));
        rows.push(row);
    }
    Ok(rows)
}

/// Converts a spreadsheet value, which already carries a type, into a `Cell`. Strings go through
/// the same coercion as delimited text.
fn data_to_cell(data: &Data, decimal: DecimalSeparator) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(Decimal::from(*i)),
        Data::Float(f) => Decimal::from_f64(*f)
            .map(Cell::Number)
            .unwrap_or_else(|| Cell::Text(f.to_string())),
        Data::String(s) => Cell::coerce(s, decimal),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(timestamp) => Cell::Timestamp(timestamp),
            None => Decimal::from_f64(dt.as_f64())
                .map(Cell::Number)
                .unwrap_or_default(),
        },
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(Cell::Timestamp)
            .unwrap_or_else(|_| Cell::coerce(s, decimal)),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
        Data::Empty => Cell::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::write_fixture;
    use std::str::FromStr;
    use tempfile::TempDir;

    #[test]
    fn test_read_delimited() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "trades.csv",
            "\u{feff}Date(UTC);Market;Price\n2018-01-02 03:04:05;ETHBTC;0.1\nshort\n",
        );
        let options = ReadOptions {
            delimiter: b';',
            ..ReadOptions::default()
        };
        let rows = read(&path, &options).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], Cell::Text("Date(UTC)".into()));
        assert!(rows[1][0].as_timestamp().is_some());
        assert_eq!(rows[1][1], Cell::Text("ETHBTC".into()));
        assert_eq!(rows[1][2], Cell::Number(Decimal::from_str("0.1").unwrap()));
        assert_eq!(rows[2].len(), 1);
    }

    #[test]
    fn test_text_columns_stay_text() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "transfers.csv",
            "Title\nTXID,Amount\n0012,0012\n1_000,1e5\n",
        );
        let options = ReadOptions {
            header_row: 1,
            text_columns: &["TXID"],
            ..ReadOptions::default()
        };
        let rows = read(&path, &options).unwrap();
        assert_eq!(rows[1][0], Cell::Text("TXID".into()));
        assert_eq!(rows[2][0], Cell::Text("0012".into()));
        assert_eq!(rows[2][1], Cell::Number(Decimal::from(12)));
        assert_eq!(rows[3][0], Cell::Text("1_000".into()));
        assert_eq!(rows[3][1], Cell::Number(Decimal::from(100_000)));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read(&dir.path().join("missing.csv"), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, FormatError::Io { .. }));
    }

    #[test]
    fn test_read_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "trades.json", "{}");
        let err = read(&path, &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_data_to_cell() {
        let d = DecimalSeparator::Point;
        assert_eq!(data_to_cell(&Data::Int(3), d), Cell::Number(Decimal::from(3)));
        assert_eq!(
            data_to_cell(&Data::Float(0.5), d),
            Cell::Number(Decimal::from_str("0.5").unwrap())
        );
        assert_eq!(
            data_to_cell(&Data::String("12.5".into()), d),
            Cell::Number(Decimal::from_str("12.5").unwrap())
        );
        assert!(data_to_cell(&Data::String("2018-01-01 00:00:00".into()), d)
            .as_timestamp()
            .is_some());
        assert!(data_to_cell(
            &Data::DateTimeIso("2018-01-01T10:11:12".into()),
            d
        )
        .as_timestamp()
        .is_some());
        assert!(data_to_cell(&Data::Empty, d).is_empty());
    }
}
