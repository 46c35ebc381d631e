//! Binance deposit and withdrawal history. Both files share one layout and differ only in the
//! direction of the transfers they list.

use crate::error::FormatResult;
use crate::formats::row::Column;
use crate::formats::Schema;
use crate::model::{Deposit, Fee, Position, Record, TransferDirection};
use crate::table::{DecimalSeparator, WriteMode};
use std::path::Path;

const DATE_STR: &str = "Date(UTC)";
const COIN_STR: &str = "Coin";
const AMOUNT_STR: &str = "Amount";
const TRANSACTION_FEE_STR: &str = "TransactionFee";
const ADDRESS_STR: &str = "Address";
const TXID_STR: &str = "TXID";
const SOURCE_ADDRESS_STR: &str = "SourceAddress";
const PAYMENT_ID_STR: &str = "PaymentID";
const STATUS_STR: &str = "Status";

const COLUMNS: &[&str] = &[
    DATE_STR,
    COIN_STR,
    AMOUNT_STR,
    TRANSACTION_FEE_STR,
    ADDRESS_STR,
    TXID_STR,
    SOURCE_ADDRESS_STR,
    PAYMENT_ID_STR,
    STATUS_STR,
];

const REQUIRED: &[&str] = &[DATE_STR, COIN_STR, AMOUNT_STR];

const IDENTIFIERS: &[&str] = &[
    ADDRESS_STR,
    TXID_STR,
    SOURCE_ADDRESS_STR,
    PAYMENT_ID_STR,
    STATUS_STR,
];

const TRANSFERS: Schema = Schema {
    name: "binance-transfers",
    exchange: "Binance",
    version: 1,
    columns: COLUMNS,
    required: REQUIRED,
    delimiter: b',',
    decimal: DecimalSeparator::Point,
    leading_rows: 0,
    legacy_date_format: None,
    text_columns: IDENTIFIERS,
    write_mode: WriteMode::Truncate,
    default_extension: "csv",
};

pub(super) static DEPOSITS_SCHEMA: Schema = Schema {
    name: "binance-deposits",
    ..TRANSFERS
};

pub(super) static WITHDRAWALS_SCHEMA: Schema = Schema {
    name: "binance-withdrawals",
    ..TRANSFERS
};

#[derive(Debug, Clone, Copy)]
enum TransferColumn {
    Date,
    Coin,
    Amount,
    TransactionFee,
    Address,
    Txid,
    SourceAddress,
    Status,
}

impl Column for TransferColumn {
    #[cfg(test)]
    const ALL: &'static [Self] = &[
        TransferColumn::Date,
        TransferColumn::Coin,
        TransferColumn::Amount,
        TransferColumn::TransactionFee,
        TransferColumn::Address,
        TransferColumn::Txid,
        TransferColumn::SourceAddress,
        TransferColumn::Status,
    ];

    fn header(self) -> &'static str {
        match self {
            TransferColumn::Date => DATE_STR,
            TransferColumn::Coin => COIN_STR,
            TransferColumn::Amount => AMOUNT_STR,
            TransferColumn::TransactionFee => TRANSACTION_FEE_STR,
            TransferColumn::Address => ADDRESS_STR,
            TransferColumn::Txid => TXID_STR,
            TransferColumn::SourceAddress => SOURCE_ADDRESS_STR,
            TransferColumn::Status => STATUS_STR,
        }
    }
}

pub(super) fn parse_deposits(path: &Path) -> FormatResult<Vec<Record>> {
    parse(&DEPOSITS_SCHEMA, TransferDirection::Deposit, path)
}

pub(super) fn parse_withdrawals(path: &Path) -> FormatResult<Vec<Record>> {
    parse(&WITHDRAWALS_SCHEMA, TransferDirection::Withdrawal, path)
}

fn parse(
    schema: &'static Schema,
    direction: TransferDirection,
    path: &Path,
) -> FormatResult<Vec<Record>> {
    let table = schema.load(path)?;
    let mut records = Vec::with_capacity(table.len());

    for row in table.rows() {
        let row = row?;
        let coin = row.currency(TransferColumn::Coin)?;
        let fee = Fee::new(
            row.decimal_or_zero(TransferColumn::TransactionFee)?,
            coin.clone(),
        );
        let mut address = row.text(TransferColumn::Address);
        if address.is_empty() {
            address = row.text(TransferColumn::SourceAddress);
        }

        let deposit = Deposit::new(
            row.timestamp(TransferColumn::Date)?,
            direction,
            Position::new(row.amount(TransferColumn::Amount)?, coin),
            fee,
        )
        .with_address(address)
        .with_txid(row.text(TransferColumn::Txid))
        .with_status(row.text(TransferColumn::Status))
        .with_exchange(schema.exchange);
        records.push(deposit.into());
    }

    Ok(records)
}
