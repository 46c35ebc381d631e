//! The file formats that can be converted, and the schema registry describing them.
//!
//! Every format is a variant of `Format`. A variant knows its `Schema` and can parse files of its
//! format into canonical records. Some formats can also export records.

mod binance;
mod binance_crawler;
mod binance_transfers;
mod bitpanda;
mod delta;
mod row;
mod schema;

use crate::error::{FormatError, FormatResult};
use crate::model::{canonical_symbol, Currency, Record};
use crate::symbols::SymbolResolver;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub use schema::Schema;

/// A supported file format.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// Binance trade history.
    Binance,
    /// Trades collected by the Binance API crawler.
    #[serde(alias = "binancecrawler")]
    #[value(alias = "binancecrawler")]
    BinanceCrawler,
    /// Bitpanda transaction history.
    Bitpanda,
    /// Binance deposit history.
    BinanceDeposits,
    /// Binance withdrawal history.
    BinanceWithdrawals,
    /// Delta portfolio import.
    Delta,
}

serde_plain::derive_display_from_serialize!(Format);
serde_plain::derive_fromstr_from_deserialize!(Format);

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Binance,
        Format::BinanceCrawler,
        Format::Bitpanda,
        Format::BinanceDeposits,
        Format::BinanceWithdrawals,
        Format::Delta,
    ];

    pub fn schema(self) -> &'static Schema {
        match self {
            Format::Binance => &binance::SCHEMA,
            Format::BinanceCrawler => &binance_crawler::SCHEMA,
            Format::Bitpanda => &bitpanda::SCHEMA,
            Format::BinanceDeposits => &binance_transfers::DEPOSITS_SCHEMA,
            Format::BinanceWithdrawals => &binance_transfers::WITHDRAWALS_SCHEMA,
            Format::Delta => &delta::SCHEMA,
        }
    }

    /// Whether parsing this format has to look up currency symbols.
    pub fn needs_symbols(self) -> bool {
        matches!(self, Format::Binance)
    }

    pub fn can_export(self) -> bool {
        matches!(self, Format::Binance | Format::Delta)
    }

    /// The file extension used for output when none is given.
    pub fn default_extension(self) -> &'static str {
        self.schema().default_extension
    }

    /// Parses `path` into records, in file order.
    ///
    /// A file that does not belong to this format fails with `ParserOutdated` (header drift) or
    /// `MalformedRow` (content that cannot be read).
    pub fn parse(self, path: &Path, resolver: &SymbolResolver) -> FormatResult<Vec<Record>> {
        let records = match self {
            Format::Binance => binance::parse(path, resolver),
            Format::BinanceCrawler => binance_crawler::parse(path),
            Format::Bitpanda => bitpanda::parse(path),
            Format::BinanceDeposits => binance_transfers::parse_deposits(path),
            Format::BinanceWithdrawals => binance_transfers::parse_withdrawals(path),
            Format::Delta => delta::parse(path),
        }?;
        info!(
            "Parsed {} records from {} as {self}",
            records.len(),
            path.display()
        );
        Ok(records)
    }

    /// Writes `records` to `path` in this format, ordered by time. Returns the number of rows
    /// written.
    pub fn export(self, records: &[Record], path: &Path) -> FormatResult<usize> {
        let written = match self {
            Format::Binance => binance::export(records, path),
            Format::Delta => delta::export(records, path),
            _ => Err(FormatError::ExportUnsupported {
                format: self.to_string(),
            }),
        }?;
        info!("Wrote {written} {self} rows to {}", path.display());
        Ok(written)
    }
}

/// The records in chronological order. Records with equal timestamps keep their input order.
fn chronological(records: &[Record]) -> Vec<&Record> {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by_key(|r| r.timestamp());
    sorted
}

/// The symbol a target format expects for `currency`. `aliases` maps a symbol, in either its
/// own or its listed spelling, to the spelling of the target.
fn export_symbol(currency: &Currency, aliases: &[(&str, &str)]) -> String {
    let symbol = currency.symbol().to_uppercase();
    let canonical = canonical_symbol(&symbol);
    aliases
        .iter()
        .find(|(from, _)| *from == symbol || *from == canonical)
        .map(|(_, to)| to.to_string())
        .unwrap_or(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fee, Position, TradingPair, Transaction};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_format_names() {
        assert_eq!(Format::BinanceCrawler.to_string(), "binance-crawler");
        assert_eq!(
            Format::from_str("binancecrawler").unwrap(),
            Format::BinanceCrawler
        );
        assert_eq!(Format::from_str("delta").unwrap(), Format::Delta);
        assert!(Format::from_str("kraken").is_err());
    }

    #[test]
    fn test_schema_names_match_formats() {
        for format in Format::ALL {
            assert_eq!(format.schema().name, format.to_string());
        }
    }

    #[test]
    fn test_export_unsupported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let err = Format::Bitpanda.export(&[], &path).unwrap_err();
        assert!(matches!(err, FormatError::ExportUnsupported { .. }));
        assert!(!path.exists());
    }

    fn trade_at(hour: u32, trading_type: &str) -> Record {
        let pair = TradingPair::new(
            Position::new(Decimal::ONE, Currency::new("BTC")),
            Position::new(Decimal::TEN, Currency::new("ETH")),
        );
        Transaction::new(
            Utc.with_ymd_and_hms(2018, 1, 1, hour, 0, 0).unwrap(),
            pair,
            trading_type,
            Decimal::new(1, 1),
            Fee::zero(Currency::new("BTC")),
        )
        .into()
    }

    #[test]
    fn test_chronological_is_stable() {
        let records = vec![
            trade_at(2, "first at two"),
            trade_at(1, "one"),
            trade_at(3, "three"),
            trade_at(2, "second at two"),
        ];
        let types: Vec<&str> = chronological(&records)
            .into_iter()
            .map(|r| r.as_trade().unwrap().trading_type())
            .collect();
        assert_eq!(types, vec!["one", "first at two", "second at two", "three"]);
    }

    #[test]
    fn test_export_symbol() {
        let aliases = [("MIOTA", "IOTA")];
        assert_eq!(export_symbol(&Currency::new("MIOTA"), &aliases), "IOTA");
        assert_eq!(export_symbol(&Currency::new("IOTA"), &aliases), "IOTA");
        assert_eq!(export_symbol(&Currency::new("eth"), &aliases), "ETH");

        let aliases = [("IOTA", "MIOTA")];
        assert_eq!(export_symbol(&Currency::new("IOTA"), &aliases), "MIOTA");
        assert_eq!(export_symbol(&Currency::new("MIOTA"), &aliases), "MIOTA");
    }
}
