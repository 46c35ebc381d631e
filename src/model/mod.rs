//! The canonical transaction model that every parser produces and every exporter consumes.
mod currency;
mod position;
mod transaction;

pub use currency::{canonical_symbol, Currency};
pub use position::{Fee, Position};
pub use transaction::{Deposit, Record, TradingPair, Transaction, TransferDirection};
