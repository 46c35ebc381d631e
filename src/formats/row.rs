use crate::error::{FormatError, FormatResult};
use crate::formats::Schema;
use crate::model::Currency;
use crate::table::Cell;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A column of a specific format. Each format has an enum implementing this so that a parser can
/// only ask a `Row` for columns that exist.
pub(crate) trait Column: Copy + Debug + 'static {
    #[cfg(test)]
    const ALL: &'static [Self];

    fn header(self) -> &'static str;
}

/// One data row bound to the header of its file.
#[derive(Debug)]
pub(crate) struct Row<'a> {
    schema: &'static Schema,
    line: usize,
    values: BTreeMap<&'a str, &'a Cell>,
}

impl<'a> Row<'a> {
    pub(crate) fn bind(
        schema: &'static Schema,
        line: usize,
        header: &'a [String],
        cells: &'a [Cell],
    ) -> FormatResult<Self> {
        if cells.len() != header.len() {
            return Err(schema.malformed(
                line,
                format!(
                    "the row has {} cells but the header has {} columns",
                    cells.len(),
                    header.len()
                ),
            ));
        }
        let values = header.iter().map(String::as_str).zip(cells).collect();
        Ok(Self {
            schema,
            line,
            values,
        })
    }

    /// The 1-based line of this row in the source file.
    pub(crate) fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> FormatError {
        self.schema.malformed(self.line, reason)
    }

    /// The cell of `column`. An optional column that the file lacks reads as an empty cell.
    pub(crate) fn cell<C: Column>(&self, column: C) -> &'a Cell {
        static EMPTY: Cell = Cell::Text(String::new());
        self.values.get(column.header()).copied().unwrap_or(&EMPTY)
    }

    /// The trimmed text of `column`, whatever the cell type.
    pub(crate) fn text<C: Column>(&self, column: C) -> String {
        match self.cell(column) {
            Cell::Text(s) => s.trim().to_string(),
            other => other.to_string(),
        }
    }

    /// Like `text` but fails when the cell is empty.
    pub(crate) fn required_text<C: Column>(&self, column: C) -> FormatResult<String> {
        let text = self.text(column);
        if text.is_empty() {
            return Err(self.malformed(format!("the '{}' column is empty", column.header())));
        }
        Ok(text)
    }

    pub(crate) fn decimal<C: Column>(&self, column: C) -> FormatResult<Decimal> {
        match self.cell(column) {
            Cell::Number(n) => Ok(*n),
            other => Err(self.malformed(format!(
                "expected a number in the '{}' column, found '{other}'",
                column.header()
            ))),
        }
    }

    /// A number that reads as zero when the cell is empty.
    pub(crate) fn decimal_or_zero<C: Column>(&self, column: C) -> FormatResult<Decimal> {
        if self.cell(column).is_empty() {
            return Ok(Decimal::ZERO);
        }
        self.decimal(column)
    }

    /// A number that must not be negative.
    pub(crate) fn amount<C: Column>(&self, column: C) -> FormatResult<Decimal> {
        let value = self.decimal(column)?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(self.malformed(format!(
                "the '{}' column is negative ({value})",
                column.header()
            )));
        }
        Ok(value)
    }

    /// A point in time, interpreted as UTC. Text cells are tried against the schema's legacy date
    /// layout.
    pub(crate) fn timestamp<C: Column>(&self, column: C) -> FormatResult<DateTime<Utc>> {
        match self.cell(column) {
            Cell::Timestamp(t) => Ok(t.and_utc()),
            Cell::Text(s) => self
                .schema
                .legacy_date_format
                .and_then(|layout| NaiveDateTime::parse_from_str(s.trim(), layout).ok())
                .map(|t| t.and_utc())
                .ok_or_else(|| {
                    self.malformed(format!(
                        "unable to read '{s}' in the '{}' column as a date",
                        column.header()
                    ))
                }),
            Cell::Number(n) => Err(self.malformed(format!(
                "expected a date in the '{}' column, found the number {n}",
                column.header()
            ))),
        }
    }

    /// A currency symbol. An empty cell is a malformed row.
    pub(crate) fn currency<C: Column>(&self, column: C) -> FormatResult<Currency> {
        self.required_text(column).map(Currency::new)
    }
}

/// Asserts that every column of `C`, and every required or text column, is known to `schema`.
/// Required columns do not need a variant, a parser may validate a column it never reads.
#[cfg(test)]
pub(crate) fn assert_columns_known<C: Column>(schema: &Schema) {
    for column in C::ALL {
        assert!(
            schema.columns.contains(&column.header()),
            "{column:?} is not a column of {}",
            schema.name
        );
    }
    for name in schema.required.iter().chain(schema.text_columns) {
        assert!(
            schema.columns.contains(name),
            "{name} is not a column of {}",
            schema.name
        );
    }
}
