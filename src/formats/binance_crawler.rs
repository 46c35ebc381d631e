//! Trades collected from the Binance API by the crawler, one trade per line.

use crate::error::FormatResult;
use crate::formats::row::Column;
use crate::formats::Schema;
use crate::model::{Fee, Position, Record, TradingPair, Transaction};
use crate::table::{Cell, DecimalSeparator, WriteMode};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use std::path::Path;

const TIME_STR: &str = "time";
const SIDE_STR: &str = "side";
const TRADE_ID_STR: &str = "tradeId";
const QTY_STR: &str = "qty";
const FEE_ASSET_STR: &str = "feeAsset";
const SYMBOL_STR: &str = "symbol";
const TOTAL_QUOTA_STR: &str = "totalQuota";
const REAL_PNL_STR: &str = "realPnl";
const QUOTE_ASSET_STR: &str = "quoteAsset";
const BASE_ASSET_STR: &str = "baseAsset";
const ID_STR: &str = "id";
const FEE_STR: &str = "fee";
const PRICE_STR: &str = "price";
const ACTIVE_BUY_STR: &str = "activeBuy";

const COLUMNS: &[&str] = &[
    TIME_STR,
    SIDE_STR,
    TRADE_ID_STR,
    QTY_STR,
    FEE_ASSET_STR,
    SYMBOL_STR,
    TOTAL_QUOTA_STR,
    REAL_PNL_STR,
    QUOTE_ASSET_STR,
    BASE_ASSET_STR,
    ID_STR,
    FEE_STR,
    PRICE_STR,
    ACTIVE_BUY_STR,
];

pub(super) static SCHEMA: Schema = Schema {
    name: "binance-crawler",
    exchange: "Binance",
    version: 1,
    columns: COLUMNS,
    required: COLUMNS,
    delimiter: b';',
    decimal: DecimalSeparator::Point,
    leading_rows: 0,
    legacy_date_format: None,
    text_columns: &[],
    write_mode: WriteMode::Truncate,
    default_extension: "csv",
};

/// The columns the parser reads. The others are validated but ignored.
#[derive(Debug, Clone, Copy)]
enum CrawlerColumn {
    Time,
    Side,
    Qty,
    FeeAsset,
    TotalQuota,
    QuoteAsset,
    BaseAsset,
    Fee,
    Price,
}

impl Column for CrawlerColumn {
    #[cfg(test)]
    const ALL: &'static [Self] = &[
        CrawlerColumn::Time,
        CrawlerColumn::Side,
        CrawlerColumn::Qty,
        CrawlerColumn::FeeAsset,
        CrawlerColumn::TotalQuota,
        CrawlerColumn::QuoteAsset,
        CrawlerColumn::BaseAsset,
        CrawlerColumn::Fee,
        CrawlerColumn::Price,
    ];

    fn header(self) -> &'static str {
        match self {
            CrawlerColumn::Time => TIME_STR,
            CrawlerColumn::Side => SIDE_STR,
            CrawlerColumn::Qty => QTY_STR,
            CrawlerColumn::FeeAsset => FEE_ASSET_STR,
            CrawlerColumn::TotalQuota => TOTAL_QUOTA_STR,
            CrawlerColumn::QuoteAsset => QUOTE_ASSET_STR,
            CrawlerColumn::BaseAsset => BASE_ASSET_STR,
            CrawlerColumn::Fee => FEE_STR,
            CrawlerColumn::Price => PRICE_STR,
        }
    }
}

pub(super) fn parse(path: &Path) -> FormatResult<Vec<Record>> {
    let table = SCHEMA.load(path)?;
    let mut records = Vec::with_capacity(table.len());

    for row in table.rows() {
        let row = row?;

        let timestamp = match row.cell(CrawlerColumn::Time) {
            Cell::Number(millis) => millis
                .trunc()
                .to_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis),
            _ => None,
        }
        .ok_or_else(|| {
            row.malformed(format!(
                "'{}' is not a time in epoch milliseconds",
                row.cell(CrawlerColumn::Time)
            ))
        })?;

        let pair = TradingPair::new(
            Position::new(
                row.amount(CrawlerColumn::TotalQuota)?,
                row.currency(CrawlerColumn::QuoteAsset)?,
            ),
            Position::new(
                row.amount(CrawlerColumn::Qty)?,
                row.currency(CrawlerColumn::BaseAsset)?,
            ),
        );
        let transaction = Transaction::new(
            timestamp,
            pair,
            row.required_text(CrawlerColumn::Side)?,
            row.amount(CrawlerColumn::Price)?,
            Fee::new(
                row.amount(CrawlerColumn::Fee)?,
                row.currency(CrawlerColumn::FeeAsset)?,
            ),
        )
        .with_exchange(SCHEMA.exchange);
        records.push(transaction.into());
    }

    Ok(records)
}
