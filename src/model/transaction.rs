use crate::model::{Currency, Fee, Position};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The two sides of a trade: the quote is the pricing currency, the base is the traded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingPair {
    quote: Position,
    base: Position,
}

impl TradingPair {
    pub fn new(quote: Position, base: Position) -> Self {
        Self { quote, base }
    }

    pub fn quote(&self) -> &Position {
        &self.quote
    }

    pub fn base(&self) -> &Position {
        &self.base
    }
}

/// One trade execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    timestamp: DateTime<Utc>,
    pair: TradingPair,
    /// Free-form as found in the source, e.g. `Buy`, `sell`, `BUY`.
    trading_type: String,
    /// Quote per base unit.
    price: Decimal,
    fee: Fee,
    exchange: Option<String>,
}

impl Transaction {
    pub fn new(
        timestamp: DateTime<Utc>,
        pair: TradingPair,
        trading_type: impl Into<String>,
        price: Decimal,
        fee: Fee,
    ) -> Self {
        Self {
            timestamp,
            pair,
            trading_type: trading_type.into(),
            price,
            fee,
            exchange: None,
        }
    }

    /// Records the exchange on which the trade took place.
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    pub fn trading_type(&self) -> &str {
        &self.trading_type
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn fee(&self) -> &Fee {
        &self.fee
    }

    pub fn exchange(&self) -> Option<&str> {
        self.exchange.as_deref()
    }
}

/// Whether funds came into or left the account.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    Deposit,
    Withdrawal,
}

serde_plain::derive_display_from_serialize!(TransferDirection);
serde_plain::derive_fromstr_from_deserialize!(TransferDirection);

/// A deposit or withdrawal of a single currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    timestamp: DateTime<Utc>,
    direction: TransferDirection,
    position: Position,
    fee: Fee,
    address: String,
    txid: String,
    status: String,
    exchange: Option<String>,
}

impl Deposit {
    pub fn new(
        timestamp: DateTime<Utc>,
        direction: TransferDirection,
        position: Position,
        fee: Fee,
    ) -> Self {
        Self {
            timestamp,
            direction,
            position,
            fee,
            address: String::new(),
            txid: String::new(),
            status: String::new(),
            exchange: None,
        }
    }

    /// The target address of a withdrawal or the source address of a deposit.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// The chain-level transaction id.
    pub fn with_txid(mut self, txid: impl Into<String>) -> Self {
        self.txid = txid.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn currency(&self) -> &Currency {
        self.position.currency()
    }

    pub fn amount(&self) -> Decimal {
        self.position.amount()
    }

    pub fn fee(&self) -> &Fee {
        &self.fee
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn txid(&self) -> &str {
        &self.txid
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn exchange(&self) -> Option<&str> {
        self.exchange.as_deref()
    }
}

/// A canonical record as produced by a parser and consumed by an exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Trade(Transaction),
    Transfer(Deposit),
}

impl Record {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Record::Trade(t) => t.timestamp(),
            Record::Transfer(d) => d.timestamp(),
        }
    }

    pub fn exchange(&self) -> Option<&str> {
        match self {
            Record::Trade(t) => t.exchange(),
            Record::Transfer(d) => d.exchange(),
        }
    }

    pub fn as_trade(&self) -> Option<&Transaction> {
        match self {
            Record::Trade(t) => Some(t),
            Record::Transfer(_) => None,
        }
    }

    pub fn as_transfer(&self) -> Option<&Deposit> {
        match self {
            Record::Trade(_) => None,
            Record::Transfer(d) => Some(d),
        }
    }
}

impl From<Transaction> for Record {
    fn from(value: Transaction) -> Self {
        Record::Trade(value)
    }
}

impl From<Deposit> for Record {
    fn from(value: Deposit) -> Self {
        Record::Transfer(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_transfer_direction_strings() {
        assert_eq!(TransferDirection::Withdrawal.to_string(), "withdrawal");
        let parsed: TransferDirection = "deposit".parse().unwrap();
        assert_eq!(parsed, TransferDirection::Deposit);
    }

    #[test]
    fn test_record_accessors() {
        let ts = Utc.with_ymd_and_hms(2018, 5, 4, 3, 2, 1).unwrap();
        let deposit = Deposit::new(
            ts,
            TransferDirection::Deposit,
            Position::new(Decimal::TEN, Currency::new("ETH")),
            Fee::zero(Currency::new("ETH")),
        )
        .with_txid("0xabc")
        .with_exchange("Binance");
        let record = Record::from(deposit);
        assert_eq!(record.timestamp(), ts);
        assert_eq!(record.exchange(), Some("Binance"));
        assert!(record.as_trade().is_none());
        assert_eq!(record.as_transfer().unwrap().txid(), "0xabc");
    }
}
