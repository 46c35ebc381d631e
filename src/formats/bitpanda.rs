//! Bitpanda transaction history.
//!
//! The file starts with a disclaimer line and a title line before the header. Only buys and sells
//! are converted. Bitpanda does not report a fee, so a zero fee in the fiat currency is used.

use crate::error::FormatResult;
use crate::formats::row::{Column, Row};
use crate::formats::Schema;
use crate::model::{Fee, Position, Record, TradingPair, Transaction};
use crate::table::{Cell, DecimalSeparator, WriteMode};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::trace;

const ID_STR: &str = "ID";
const CREATED_AT_STR: &str = "Created at";
const TYPE_STR: &str = "Type";
const IN_OUT_STR: &str = "In/Out";
const FIAT_CURRENCY_STR: &str = "Fiat Currency";
const AMOUNT_FIAT_STR: &str = "Amount Fiat";
const CRYPTOCOIN_STR: &str = "Cryptocoin";
const AMOUNT_CRYPTOCOIN_STR: &str = "Amount Cryptocoin";
const STATUS_STR: &str = "Status";

const BUY: &str = "buy";
const SELL: &str = "sell";

pub(super) static SCHEMA: Schema = Schema {
    name: "bitpanda",
    exchange: "Bitpanda",
    version: 1,
    columns: &[
        ID_STR,
        CREATED_AT_STR,
        TYPE_STR,
        IN_OUT_STR,
        FIAT_CURRENCY_STR,
        AMOUNT_FIAT_STR,
        CRYPTOCOIN_STR,
        AMOUNT_CRYPTOCOIN_STR,
        STATUS_STR,
    ],
    required: &[
        CREATED_AT_STR,
        TYPE_STR,
        FIAT_CURRENCY_STR,
        AMOUNT_FIAT_STR,
        CRYPTOCOIN_STR,
        AMOUNT_CRYPTOCOIN_STR,
    ],
    delimiter: b',',
    decimal: DecimalSeparator::Point,
    leading_rows: 2,
    legacy_date_format: None,
    text_columns: &[],
    write_mode: WriteMode::Truncate,
    default_extension: "csv",
};

#[derive(Debug, Clone, Copy)]
enum BitpandaColumn {
    CreatedAt,
    Type,
    FiatCurrency,
    AmountFiat,
    Cryptocoin,
    AmountCryptocoin,
}

impl Column for BitpandaColumn {
    #[cfg(test)]
    const ALL: &'static [Self] = &[
        BitpandaColumn::CreatedAt,
        BitpandaColumn::Type,
        BitpandaColumn::FiatCurrency,
        BitpandaColumn::AmountFiat,
        BitpandaColumn::Cryptocoin,
        BitpandaColumn::AmountCryptocoin,
    ];

    fn header(self) -> &'static str {
        match self {
            BitpandaColumn::CreatedAt => CREATED_AT_STR,
            BitpandaColumn::Type => TYPE_STR,
            BitpandaColumn::FiatCurrency => FIAT_CURRENCY_STR,
            BitpandaColumn::AmountFiat => AMOUNT_FIAT_STR,
            BitpandaColumn::Cryptocoin => CRYPTOCOIN_STR,
            BitpandaColumn::AmountCryptocoin => AMOUNT_CRYPTOCOIN_STR,
        }
    }
}

pub(super) fn parse(path: &Path) -> FormatResult<Vec<Record>> {
    let table = SCHEMA.load(path)?;
    let mut records = Vec::new();

    for row in table.rows() {
        let row = row?;
        let trading_type = row.text(BitpandaColumn::Type);
        if trading_type != BUY && trading_type != SELL {
            trace!("Skipping bitpanda row {} of type '{trading_type}'", row.line());
            continue;
        }

        let fiat = row.currency(BitpandaColumn::FiatCurrency)?;
        let fiat_amount = row.amount(BitpandaColumn::AmountFiat)?;
        let crypto_amount = row.amount(BitpandaColumn::AmountCryptocoin)?;
        let price = fiat_amount
            .checked_div(crypto_amount)
            .ok_or_else(|| row.malformed("the crypto amount is zero, no price can be derived"))?;

        let pair = TradingPair::new(
            Position::new(fiat_amount, fiat.clone()),
            Position::new(crypto_amount, row.currency(BitpandaColumn::Cryptocoin)?),
        );
        let transaction = Transaction::new(
            created_at(&row)?,
            pair,
            trading_type,
            price,
            Fee::zero(fiat),
        )
        .with_exchange(SCHEMA.exchange);
        records.push(transaction.into());
    }

    Ok(records)
}

fn created_at(row: &Row<'_>) -> FormatResult<DateTime<Utc>> {
    match row.cell(BitpandaColumn::CreatedAt) {
        Cell::Text(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| row.malformed(format!("unable to read '{s}' as a date: {e}"))),
        _ => row.timestamp(BitpandaColumn::CreatedAt),
    }
}
