//! Picks the parser for a file whose format is not known.

use crate::error::FormatResult;
use crate::formats::Format;
use crate::model::Record;
use crate::symbols::SymbolResolver;
use std::path::Path;
use tracing::{debug, info};

/// The order in which formats are tried. Withdrawal history has the same layout as deposit
/// history, so it is only used when asked for explicitly.
pub const DEFAULT_ORDER: [Format; 5] = [
    Format::Binance,
    Format::BinanceCrawler,
    Format::Bitpanda,
    Format::BinanceDeposits,
    Format::Delta,
];

/// Tries a fixed list of formats, in order, until one of them accepts a file.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    formats: Vec<Format>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER.to_vec())
    }
}

impl Dispatcher {
    pub fn new(formats: Vec<Format>) -> Self {
        Self { formats }
    }

    pub fn formats(&self) -> &[Format] {
        &self.formats
    }

    /// Whether any of the candidate formats has to resolve currency symbols.
    pub fn needs_symbols(&self) -> bool {
        self.formats.iter().any(|f| f.needs_symbols())
    }

    /// Parses `path` with the first format that accepts it and returns that format with its
    /// records.
    ///
    /// A format rejects a file when it fails with `ParserOutdated` or `MalformedRow`, or when it
    /// finds no records. Any other error ends the search. `None` means no format accepts the file.
    pub fn detect_and_parse(
        &self,
        path: &Path,
        resolver: &SymbolResolver,
    ) -> FormatResult<Option<(Format, Vec<Record>)>> {
        for &format in &self.formats {
            debug!("Trying the {format} parser on {}", path.display());
            match format.parse(path, resolver) {
                Ok(records) if records.is_empty() => {
                    debug!("The {format} parser found no records");
                }
                Ok(records) => {
                    info!("Detected {} as {format}", path.display());
                    return Ok(Some((format, records)));
                }
                Err(e) if e.is_rejection() => {
                    debug!("The {format} parser rejects the file: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use crate::test::{resolver, write_fixture};
    use tempfile::TempDir;

    #[test]
    fn test_no_format_matches() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "other.csv", "Foo,Bar\n1,2\n");
        let detected = Dispatcher::default()
            .detect_and_parse(&path, &resolver())
            .unwrap();
        assert!(detected.is_none());
    }

    #[test]
    fn test_second_format_matches() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "crawler.csv",
            "time;side;tradeId;qty;feeAsset;symbol;totalQuota;realPnl;quoteAsset;baseAsset;id;fee;price;activeBuy\n\
            1514887200000;BUY;42;2.5;BNB;ETHBTC;0.125;0;BTC;ETH;7;0.01;0.05;true\n",
        );
        let dispatcher =
            Dispatcher::new(vec![Format::Binance, Format::BinanceCrawler, Format::Delta]);
        let (format, records) = dispatcher
            .detect_and_parse(&path, &resolver())
            .unwrap()
            .unwrap();
        assert_eq!(format, Format::BinanceCrawler);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_empty_result_falls_through() {
        let dir = TempDir::new().unwrap();
        // A bitpanda history without any trades.
        let path = write_fixture(
            &dir,
            "bitpanda.csv",
            "Disclaimer\nTitle\n\
            ID,Created at,Type,In/Out,Fiat Currency,Amount Fiat,Cryptocoin,Amount Cryptocoin,Status\n\
            T1,2018-01-04T12:00:00+00:00,deposit,incoming,EUR,200,,,finished\n",
        );
        let detected = Dispatcher::default()
            .detect_and_parse(&path, &resolver())
            .unwrap();
        assert!(detected.is_none());
    }

    #[test]
    fn test_io_error_stops_search() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.csv");
        let err = Dispatcher::default()
            .detect_and_parse(&path, &resolver())
            .unwrap_err();
        assert!(matches!(err, FormatError::Io { .. }));
    }

    #[test]
    fn test_default_order() {
        let dispatcher = Dispatcher::default();
        assert!(!dispatcher.formats().contains(&Format::BinanceWithdrawals));
        assert!(dispatcher.needs_symbols());
        assert!(!Dispatcher::new(vec![Format::Delta]).needs_symbols());
    }
}
