//! Binance trade history.

use crate::error::FormatResult;
use crate::formats::row::Column;
use crate::formats::{chronological, export_symbol, Schema};
use crate::model::{Currency, Fee, Position, Record, TradingPair, Transaction};
use crate::symbols::SymbolResolver;
use crate::table::{Cell, DecimalSeparator, OutputRow, WriteMode};
use std::path::Path;
use tracing::warn;

const DATE_STR: &str = "Date(UTC)";
const MARKET_STR: &str = "Market";
const TYPE_STR: &str = "Type";
const PRICE_STR: &str = "Price";
const AMOUNT_STR: &str = "Amount";
const TOTAL_STR: &str = "Total";
const FEE_STR: &str = "Fee";
const FEE_COIN_STR: &str = "Fee Coin";

const COLUMNS: &[&str] = &[
    DATE_STR,
    MARKET_STR,
    TYPE_STR,
    PRICE_STR,
    AMOUNT_STR,
    TOTAL_STR,
    FEE_STR,
    FEE_COIN_STR,
];

/// Binance spells some currencies differently from the listing.
const EXPORT_ALIASES: &[(&str, &str)] = &[("MIOTA", "IOTA")];

pub(super) static SCHEMA: Schema = Schema {
    name: "binance",
    exchange: "Binance",
    version: 2,
    columns: COLUMNS,
    required: COLUMNS,
    delimiter: b',',
    decimal: DecimalSeparator::Point,
    leading_rows: 0,
    // Older exports wrote dates like `03.01.18 12:30`.
    legacy_date_format: Some("%d.%m.%y %H:%M"),
    text_columns: &[],
    write_mode: WriteMode::Truncate,
    default_extension: "xlsx",
};

#[derive(Debug, Clone, Copy)]
enum BinanceColumn {
    Date,
    Market,
    Type,
    Price,
    Amount,
    Total,
    Fee,
    FeeCoin,
}

impl Column for BinanceColumn {
    #[cfg(test)]
    const ALL: &'static [Self] = &[
        BinanceColumn::Date,
        BinanceColumn::Market,
        BinanceColumn::Type,
        BinanceColumn::Price,
        BinanceColumn::Amount,
        BinanceColumn::Total,
        BinanceColumn::Fee,
        BinanceColumn::FeeCoin,
    ];

    fn header(self) -> &'static str {
        match self {
            BinanceColumn::Date => DATE_STR,
            BinanceColumn::Market => MARKET_STR,
            BinanceColumn::Type => TYPE_STR,
            BinanceColumn::Price => PRICE_STR,
            BinanceColumn::Amount => AMOUNT_STR,
            BinanceColumn::Total => TOTAL_STR,
            BinanceColumn::Fee => FEE_STR,
            BinanceColumn::FeeCoin => FEE_COIN_STR,
        }
    }
}

pub(super) fn parse(path: &Path, resolver: &SymbolResolver) -> FormatResult<Vec<Record>> {
    let table = SCHEMA.load(path)?;
    let mut records = Vec::with_capacity(table.len());

    for row in table.rows() {
        let row = row?;
        let market = row.required_text(BinanceColumn::Market)?;
        let (base, quote) = resolver.split_market(&market).ok_or_else(|| {
            row.malformed(format!("unable to resolve the currencies of market '{market}'"))
        })?;

        let fee_symbol = row.required_text(BinanceColumn::FeeCoin)?;
        let fee_currency = resolver
            .resolve(&fee_symbol)
            .cloned()
            .unwrap_or_else(|| Currency::new(fee_symbol));

        let pair = TradingPair::new(
            Position::new(row.amount(BinanceColumn::Total)?, quote),
            Position::new(row.amount(BinanceColumn::Amount)?, base),
        );
        let transaction = Transaction::new(
            row.timestamp(BinanceColumn::Date)?,
            pair,
            row.required_text(BinanceColumn::Type)?,
            row.amount(BinanceColumn::Price)?,
            Fee::new(row.amount(BinanceColumn::Fee)?, fee_currency),
        )
        .with_exchange(SCHEMA.exchange);
        records.push(transaction.into());
    }

    Ok(records)
}

pub(super) fn export(records: &[Record], path: &Path) -> FormatResult<usize> {
    let mut rows = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for record in chronological(records) {
        match record {
            Record::Trade(t) => rows.push(trade_row(t)),
            Record::Transfer(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("The binance format has no place for transfers, skipped {skipped} of them");
    }

    SCHEMA.write(&rows, path)?;
    Ok(rows.len())
}

fn trade_row(t: &Transaction) -> OutputRow {
    let base = t.pair().base();
    let quote = t.pair().quote();
    let market = format!(
        "{}{}",
        export_symbol(base.currency(), EXPORT_ALIASES),
        export_symbol(quote.currency(), EXPORT_ALIASES)
    );

    let mut row = OutputRow::new();
    row.insert(DATE_STR, Cell::Timestamp(t.timestamp().naive_utc()));
    row.insert(MARKET_STR, Cell::Text(market));
    row.insert(TYPE_STR, Cell::Text(t.trading_type().to_uppercase()));
    row.insert(PRICE_STR, Cell::Number(t.price()));
    row.insert(AMOUNT_STR, Cell::Number(base.amount()));
    row.insert(TOTAL_STR, Cell::Number(quote.amount()));
    row.insert(FEE_STR, Cell::Number(t.fee().amount()));
    row.insert(
        FEE_COIN_STR,
        Cell::Text(export_symbol(t.fee().currency(), EXPORT_ALIASES)),
    );
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Drift, FormatError};
    use crate::formats::row::assert_columns_known;
    use crate::model::{Deposit, TransferDirection};
    use crate::test::{resolver, write_fixture};
    use crate::table;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::TempDir;

    const TRADES: &str = "\
Date(UTC),Market,Type,Price,Amount,Total,Fee,Fee Coin
2018-01-02 10:00:00,ETHBTC,BUY,0.05,2.0,0.1,0.002,ETH
03.01.18 12:30,IOTABTC,SELL,0.0002,100,0.02,0.00002,BTC
";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_columns() {
        assert_columns_known::<BinanceColumn>(&SCHEMA);
    }

    #[test]
    fn test_parse() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "trades.csv", TRADES);
        let records = parse(&path, &resolver()).unwrap();
        assert_eq!(records.len(), 2);

        let first = records[0].as_trade().unwrap();
        assert_eq!(
            first.timestamp(),
            Utc.with_ymd_and_hms(2018, 1, 2, 10, 0, 0).unwrap()
        );
        assert_eq!(first.pair().base().currency().symbol(), "ETH");
        assert_eq!(first.pair().base().amount(), dec("2.0"));
        assert_eq!(first.pair().quote().currency().symbol(), "BTC");
        assert_eq!(first.pair().quote().amount(), dec("0.1"));
        assert_eq!(first.trading_type(), "BUY");
        assert_eq!(first.price(), dec("0.05"));
        assert_eq!(first.fee().amount(), dec("0.002"));
        assert_eq!(first.exchange(), Some("Binance"));

        // Legacy date layout and an aliased symbol.
        let second = records[1].as_trade().unwrap();
        assert_eq!(
            second.timestamp(),
            Utc.with_ymd_and_hms(2018, 1, 3, 12, 30, 0).unwrap()
        );
        assert_eq!(second.pair().base().currency().symbol(), "MIOTA");
    }

    #[test]
    fn test_parse_unknown_column() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "trades.csv",
            "Date(UTC),Market,Type,Price,Amount,Total,Fee,Fee Coin,Rebate\n\
            2018-01-02 10:00:00,ETHBTC,BUY,0.05,2.0,0.1,0.002,ETH,0\n",
        );
        let err = parse(&path, &resolver()).unwrap_err();
        assert!(matches!(
            err,
            FormatError::ParserOutdated { drift: Drift::Unknown, ref column, .. } if column == "Rebate"
        ));
    }

    #[test]
    fn test_parse_unresolved_market() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "trades.csv",
            "Date(UTC),Market,Type,Price,Amount,Total,Fee,Fee Coin\n\
            2018-01-02 10:00:00,ETHBTC,BUY,0.05,2.0,0.1,0.002,ETH\n\
            2018-01-02 11:00:00,FOOBAR,BUY,1,1,1,0,FOO\n",
        );
        let err = parse(&path, &resolver()).unwrap_err();
        match err {
            FormatError::MalformedRow { line, reason, .. } => {
                assert_eq!(line, 3);
                assert!(reason.contains("FOOBAR"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    fn trade(hour: u32, amount: &str) -> Record {
        Transaction::new(
            Utc.with_ymd_and_hms(2018, 1, 1, hour, 0, 0).unwrap(),
            TradingPair::new(
                Position::new(dec("1"), Currency::new("BTC")),
                Position::new(dec(amount), Currency::new("MIOTA")),
            ),
            "sell",
            dec("0.5"),
            Fee::new(dec("0.01"), Currency::new("BTC")),
        )
        .into()
    }

    #[test]
    fn test_export_sorted_with_aliases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let deposit = Deposit::new(
            Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap(),
            TransferDirection::Deposit,
            Position::new(dec("1"), Currency::new("BTC")),
            Fee::zero(Currency::new("BTC")),
        );
        let records = vec![trade(2, "2"), trade(1, "1"), deposit.into(), trade(3, "3")];

        let written = export(&records, &path).unwrap();
        assert_eq!(written, 3);

        let rows = table::read(&path, &SCHEMA.read_options()).unwrap();
        assert_eq!(rows.len(), 4);
        let amounts: Vec<String> = rows[1..].iter().map(|r| r[4].to_string()).collect();
        assert_eq!(amounts, vec!["1", "2", "3"]);
        assert_eq!(rows[1][1].to_string(), "IOTABTC");
        assert_eq!(rows[1][2].to_string(), "SELL");
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let source = write_fixture(&dir, "trades.csv", TRADES);
        let resolver = resolver();
        let parsed = parse(&source, &resolver).unwrap();

        let target = dir.path().join("again.csv");
        export(&parsed, &target).unwrap();
        let reparsed = parse(&target, &resolver).unwrap();
        assert_eq!(parsed, reparsed);
    }
}
