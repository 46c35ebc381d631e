//! The Delta portfolio tracker import format.
//!
//! Delta files can be read as well as written. Trades are `BUY`/`SELL` rows, transfers are
//! `DEPOSIT`/`WITHDRAW` rows. Other row types (e.g. `ICO`) are skipped when reading.

use crate::error::FormatResult;
use crate::formats::row::{Column, Row};
use crate::formats::{chronological, export_symbol, Schema};
use crate::model::{
    Currency, Deposit, Fee, Position, Record, TradingPair, Transaction, TransferDirection,
};
use crate::table::{Cell, DecimalSeparator, OutputRow, WriteMode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::trace;

/// Delta dates carry their UTC offset, e.g. `2018-01-02 10:00:00 +00:00`.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

const DATE_STR: &str = "Date";
const TYPE_STR: &str = "Type";
const EXCHANGE_STR: &str = "Exchange";
const BASE_AMOUNT_STR: &str = "Base Amount";
const BASE_CURRENCY_STR: &str = "Base currency";
const QUOTE_AMOUNT_STR: &str = "Quote amount";
const QUOTE_CURRENCY_STR: &str = "Quote currency";
const FEE_STR: &str = "Fee";
const FEE_CURRENCY_STR: &str = "Fee currency";
const COSTS_STR: &str = "Costs / Proceeds";
const COSTS_CURRENCY_STR: &str = "Costs / Proceeds currency";
const SYNC_HOLDINGS_STR: &str = "Sync Holdings";
const SENT_RECEIVED_FROM_STR: &str = "Sent / Received from";
const SENT_TO_STR: &str = "Sent to";
const NOTES_STR: &str = "Notes";

const BUY: &str = "BUY";
const SELL: &str = "SELL";
const DEPOSIT: &str = "DEPOSIT";
const WITHDRAW: &str = "WITHDRAW";

/// The counterparty of a transfer whose other side is not known.
const OTHER_WALLET: &str = "OTHER_WALLET";

/// Delta lists IOTA under its on-chain ticker.
const EXPORT_ALIASES: &[(&str, &str)] = &[("IOTA", "MIOTA")];

pub(super) static SCHEMA: Schema = Schema {
    name: "delta",
    exchange: "Delta",
    version: 1,
    columns: &[
        DATE_STR,
        TYPE_STR,
        EXCHANGE_STR,
        BASE_AMOUNT_STR,
        BASE_CURRENCY_STR,
        QUOTE_AMOUNT_STR,
        QUOTE_CURRENCY_STR,
        FEE_STR,
        FEE_CURRENCY_STR,
        COSTS_STR,
        COSTS_CURRENCY_STR,
        SYNC_HOLDINGS_STR,
        SENT_RECEIVED_FROM_STR,
        SENT_TO_STR,
        NOTES_STR,
    ],
    required: &[DATE_STR, TYPE_STR, BASE_AMOUNT_STR, BASE_CURRENCY_STR],
    delimiter: b',',
    decimal: DecimalSeparator::Point,
    leading_rows: 0,
    legacy_date_format: None,
    text_columns: &[],
    write_mode: WriteMode::Append,
    default_extension: "csv",
};

#[derive(Debug, Clone, Copy)]
enum DeltaColumn {
    Date,
    Type,
    Exchange,
    BaseAmount,
    BaseCurrency,
    QuoteAmount,
    QuoteCurrency,
    Fee,
    FeeCurrency,
}

impl Column for DeltaColumn {
    #[cfg(test)]
    const ALL: &'static [Self] = &[
        DeltaColumn::Date,
        DeltaColumn::Type,
        DeltaColumn::Exchange,
        DeltaColumn::BaseAmount,
        DeltaColumn::BaseCurrency,
        DeltaColumn::QuoteAmount,
        DeltaColumn::QuoteCurrency,
        DeltaColumn::Fee,
        DeltaColumn::FeeCurrency,
    ];

    fn header(self) -> &'static str {
        match self {
            DeltaColumn::Date => DATE_STR,
            DeltaColumn::Type => TYPE_STR,
            DeltaColumn::Exchange => EXCHANGE_STR,
            DeltaColumn::BaseAmount => BASE_AMOUNT_STR,
            DeltaColumn::BaseCurrency => BASE_CURRENCY_STR,
            DeltaColumn::QuoteAmount => QUOTE_AMOUNT_STR,
            DeltaColumn::QuoteCurrency => QUOTE_CURRENCY_STR,
            DeltaColumn::Fee => FEE_STR,
            DeltaColumn::FeeCurrency => FEE_CURRENCY_STR,
        }
    }
}

pub(super) fn parse(path: &Path) -> FormatResult<Vec<Record>> {
    let table = SCHEMA.load(path)?;
    let mut records = Vec::with_capacity(table.len());

    for row in table.rows() {
        let row = row?;
        let row_type = row.required_text(DeltaColumn::Type)?;
        let record = match row_type.to_uppercase().as_str() {
            BUY | SELL => trade(&row, row_type)?.into(),
            DEPOSIT => transfer(&row, TransferDirection::Deposit)?.into(),
            WITHDRAW => transfer(&row, TransferDirection::Withdrawal)?.into(),
            _ => {
                trace!("Skipping delta row {} of type '{row_type}'", row.line());
                continue;
            }
        };
        records.push(record);
    }

    Ok(records)
}

fn trade(row: &Row<'_>, trading_type: String) -> FormatResult<Transaction> {
    let base = Position::new(
        row.amount(DeltaColumn::BaseAmount)?,
        row.currency(DeltaColumn::BaseCurrency)?,
    );
    let quote = Position::new(
        row.amount(DeltaColumn::QuoteAmount)?,
        row.currency(DeltaColumn::QuoteCurrency)?,
    );
    let price = quote
        .amount()
        .checked_div(base.amount())
        .ok_or_else(|| row.malformed("the base amount is zero, no price can be derived"))?;
    let fee = fee(row, quote.currency())?;

    let transaction = Transaction::new(
        date(row)?,
        TradingPair::new(quote, base),
        trading_type,
        price,
        fee,
    );
    Ok(match exchange(row) {
        Some(exchange) => transaction.with_exchange(exchange),
        None => transaction,
    })
}

fn transfer(row: &Row<'_>, direction: TransferDirection) -> FormatResult<Deposit> {
    let position = Position::new(
        row.amount(DeltaColumn::BaseAmount)?,
        row.currency(DeltaColumn::BaseCurrency)?,
    );
    let fee = fee(row, position.currency())?;
    let deposit = Deposit::new(date(row)?, direction, position, fee);
    Ok(match exchange(row) {
        Some(exchange) => deposit.with_exchange(exchange),
        None => deposit,
    })
}

/// The fee of a row. Without a fee currency, the fee is in `default`.
fn fee(row: &Row<'_>, default: &Currency) -> FormatResult<Fee> {
    let amount = row.decimal_or_zero(DeltaColumn::Fee)?;
    let symbol = row.text(DeltaColumn::FeeCurrency);
    let currency = if symbol.is_empty() {
        default.clone()
    } else {
        Currency::new(symbol)
    };
    Ok(Fee::new(amount, currency))
}

fn date(row: &Row<'_>) -> FormatResult<DateTime<Utc>> {
    match row.cell(DeltaColumn::Date) {
        Cell::Text(s) => DateTime::parse_from_str(s.trim(), DATE_FORMAT)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| row.malformed(format!("unable to read '{s}' as a date: {e}"))),
        _ => row.timestamp(DeltaColumn::Date),
    }
}

fn exchange(row: &Row<'_>) -> Option<String> {
    Some(row.text(DeltaColumn::Exchange)).filter(|s| !s.is_empty())
}

pub(super) fn export(records: &[Record], path: &Path) -> FormatResult<usize> {
    let rows: Vec<OutputRow> = chronological(records)
        .into_iter()
        .map(|record| match record {
            Record::Trade(t) => trade_row(t),
            Record::Transfer(d) => transfer_row(d),
        })
        .collect();
    SCHEMA.write(&rows, path)?;
    Ok(rows.len())
}

fn symbol(currency: &Currency) -> Cell {
    Cell::Text(export_symbol(currency, EXPORT_ALIASES))
}

fn date_cell(timestamp: DateTime<Utc>) -> Cell {
    Cell::Text(timestamp.format(DATE_FORMAT).to_string())
}

fn trade_row(t: &Transaction) -> OutputRow {
    let mut row = OutputRow::new();
    row.insert(DATE_STR, date_cell(t.timestamp()));
    row.insert(TYPE_STR, Cell::Text(t.trading_type().to_uppercase()));
    if let Some(exchange) = t.exchange() {
        row.insert(EXCHANGE_STR, Cell::from(exchange));
    }
    row.insert(BASE_AMOUNT_STR, Cell::Number(t.pair().base().amount()));
    row.insert(BASE_CURRENCY_STR, symbol(t.pair().base().currency()));
    row.insert(QUOTE_AMOUNT_STR, Cell::Number(t.pair().quote().amount()));
    row.insert(QUOTE_CURRENCY_STR, symbol(t.pair().quote().currency()));
    row.insert(FEE_STR, Cell::Number(t.fee().amount()));
    row.insert(FEE_CURRENCY_STR, symbol(t.fee().currency()));
    row.insert(SYNC_HOLDINGS_STR, Cell::Number(Decimal::ONE));
    row
}

fn transfer_row(d: &Deposit) -> OutputRow {
    let mut row = OutputRow::new();
    row.insert(DATE_STR, date_cell(d.timestamp()));
    if let Some(exchange) = d.exchange() {
        row.insert(EXCHANGE_STR, Cell::from(exchange));
    }
    row.insert(BASE_AMOUNT_STR, Cell::Number(d.amount()));
    row.insert(BASE_CURRENCY_STR, symbol(d.currency()));
    row.insert(FEE_STR, Cell::Number(d.fee().amount()));
    row.insert(FEE_CURRENCY_STR, symbol(d.fee().currency()));
    match d.direction() {
        TransferDirection::Deposit => {
            row.insert(TYPE_STR, Cell::from(DEPOSIT));
            row.insert(SENT_RECEIVED_FROM_STR, Cell::from(OTHER_WALLET));
        }
        TransferDirection::Withdrawal => {
            row.insert(TYPE_STR, Cell::from(WITHDRAW));
            row.insert(SENT_TO_STR, Cell::from(OTHER_WALLET));
        }
    }

    let notes: Vec<String> = [("TXID", d.txid()), ("Address", d.address()), ("Status", d.status())]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| format!("{label}: {value}"))
        .collect();
    if !notes.is_empty() {
        row.insert(NOTES_STR, Cell::Text(notes.join("; ")));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use crate::formats::row::assert_columns_known;
    use crate::table;
    use crate::test::write_fixture;
    use chrono::TimeZone;
    use std::str::FromStr;
    use tempfile::TempDir;

    const HEADER: &str = "Date,Type,Exchange,Base Amount,Base currency,Quote amount,Quote currency,Fee,Fee currency,Costs / Proceeds,Costs / Proceeds currency,Sync Holdings,Sent / Received from,Sent to,Notes";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 3, 1, hour, 0, 0).unwrap()
    }

    fn trade_at(hour: u32, base: &str) -> Record {
        Transaction::new(
            at(hour),
            TradingPair::new(
                Position::new(dec("0.2"), Currency::new("BTC")),
                Position::new(dec("4"), Currency::new(base)),
            ),
            "buy",
            dec("0.05"),
            Fee::new(dec("0.001"), Currency::new("BNB")),
        )
        .with_exchange("Binance")
        .into()
    }

    #[test]
    fn test_columns() {
        assert_columns_known::<DeltaColumn>(&SCHEMA);
    }

    #[test]
    fn test_parse() {
        let dir = TempDir::new().unwrap();
        let content = format!(
            "{HEADER}\n\
            2018-03-01 10:00:00 +01:00,BUY,Binance,4,ETH,0.2,BTC,0.001,BNB,,,1,,,\n\
            2018-03-01 11:00:00 +00:00,DEPOSIT,Binance,1.5,BTC,,,,,,,,OTHER_WALLET,,\n\
            2018-03-01 12:00:00 +00:00,ICO,,100,XYZ,,,,,10,ETH,,ICO,,\n\
            2018-03-01 13:00:00 +00:00,WITHDRAW,,1,ETH,,,0.01,,,,,,OTHER_WALLET,\n"
        );
        let path = write_fixture(&dir, "delta.csv", &content);
        let records = parse(&path).unwrap();
        assert_eq!(records.len(), 3);

        let buy = records[0].as_trade().unwrap();
        assert_eq!(buy.timestamp(), at(9));
        assert_eq!(buy.price(), dec("0.05"));
        assert_eq!(buy.pair().base().currency().symbol(), "ETH");
        assert_eq!(buy.exchange(), Some("Binance"));

        let deposit = records[1].as_transfer().unwrap();
        assert_eq!(deposit.direction(), TransferDirection::Deposit);
        assert_eq!(deposit.amount(), dec("1.5"));
        assert!(deposit.fee().amount().is_zero());
        assert_eq!(deposit.fee().currency().symbol(), "BTC");

        let withdrawal = records[2].as_transfer().unwrap();
        assert_eq!(withdrawal.direction(), TransferDirection::Withdrawal);
        assert_eq!(withdrawal.fee().currency().symbol(), "ETH");
        assert_eq!(withdrawal.exchange(), None);
    }

    #[test]
    fn test_parse_trade_without_quote() {
        let dir = TempDir::new().unwrap();
        let content = format!("{HEADER}\n2018-03-01 10:00:00 +00:00,SELL,,4,ETH,,,,,,,1,,,\n");
        let path = write_fixture(&dir, "delta.csv", &content);
        let err = parse(&path).unwrap_err();
        assert!(matches!(err, FormatError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_export_orders_by_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("delta.csv");
        let records = vec![trade_at(2, "T2"), trade_at(1, "T1"), trade_at(3, "T3")];
        assert_eq!(export(&records, &path).unwrap(), 3);

        let rows = table::read(&path, &SCHEMA.read_options()).unwrap();
        let bases: Vec<String> = rows[1..].iter().map(|r| r[4].to_string()).collect();
        assert_eq!(bases, vec!["T1", "T2", "T3"]);
        assert_eq!(rows[1][0].to_string(), "2018-03-01 01:00:00 +00:00");
        assert_eq!(rows[1][1].to_string(), "BUY");
        assert_eq!(rows[1][11].to_string(), "1");
        assert!(rows[1][9].is_empty());
    }

    #[test]
    fn test_export_aliases_iota() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("delta.csv");
        export(&[trade_at(1, "IOTA")], &path).unwrap();
        let rows = table::read(&path, &SCHEMA.read_options()).unwrap();
        assert_eq!(rows[1][4].to_string(), "MIOTA");
    }

    #[test]
    fn test_export_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("delta.csv");
        export(&[trade_at(1, "ETH")], &path).unwrap();
        export(&[trade_at(2, "LTC")], &path).unwrap();

        let rows = table::read(&path, &SCHEMA.read_options()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0].to_string(), DATE_STR);
        assert_eq!(rows[2][4].to_string(), "LTC");
    }

    #[test]
    fn test_export_appends_to_header_without_newline() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "delta.csv", &SCHEMA.columns.join(","));
        export(&[trade_at(1, "ETH")], &path).unwrap();

        let records = parse(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].as_trade().unwrap().pair().base().currency().symbol(),
            "ETH"
        );
    }

    #[test]
    fn test_export_transfer_notes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("delta.csv");
        let withdrawal = Deposit::new(
            at(5),
            TransferDirection::Withdrawal,
            Position::new(dec("2"), Currency::new("ETH")),
            Fee::new(dec("0.01"), Currency::new("ETH")),
        )
        .with_txid("0xabc")
        .with_status("Completed");
        export(&[withdrawal.into()], &path).unwrap();

        let rows = table::read(&path, &SCHEMA.read_options()).unwrap();
        assert_eq!(rows[1][1].to_string(), WITHDRAW);
        assert_eq!(rows[1][13].to_string(), OTHER_WALLET);
        assert_eq!(rows[1][14].to_string(), "TXID: 0xabc; Status: Completed");
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("delta.csv");
        let records = vec![trade_at(1, "ETH"), trade_at(2, "LTC")];
        export(&records, &path).unwrap();
        let parsed = parse(&path).unwrap();

        assert_eq!(parsed.len(), 2);
        for (original, parsed) in records.iter().zip(&parsed) {
            let (original, parsed) = (original.as_trade().unwrap(), parsed.as_trade().unwrap());
            assert_eq!(original.timestamp(), parsed.timestamp());
            assert_eq!(original.pair(), parsed.pair());
            assert_eq!(original.fee(), parsed.fee());
            assert_eq!(parsed.trading_type(), "BUY");
            assert_eq!(parsed.price(), original.price());
        }
    }
}
