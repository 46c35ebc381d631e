//! Resolves short currency symbols against a listing of known currencies.
//!
//! The listing itself comes from a `SymbolSource`. In production that is `HttpListing` or
//! `FileListing`; tests build a `SymbolResolver` straight from a fixed set of currencies.

mod listing;

use crate::model::{canonical_symbol, Currency};
use crate::Result;
use anyhow::Context;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

pub use listing::{FileListing, HttpListing};

/// Provides the master list of known currencies.
#[async_trait::async_trait]
pub trait SymbolSource: Send + Sync {
    async fn listing(&self) -> Result<Vec<Currency>>;
}

/// An immutable lookup table from symbol to `Currency`.
#[derive(Debug, Clone, Default)]
pub struct SymbolResolver {
    currencies: Vec<Currency>,
    by_symbol: HashMap<String, usize>,
}

impl SymbolResolver {
    /// Builds the table from `source`. This is the only place where the listing is fetched.
    pub async fn load(source: &dyn SymbolSource) -> Result<Self> {
        let currencies = source
            .listing()
            .await
            .context("Unable to load the currency listing")?;
        let resolver = Self::from_currencies(currencies);
        debug!("Loaded {} currencies", resolver.len());
        Ok(resolver)
    }

    /// Builds the table from `currencies`. When a symbol is listed more than once, the first entry
    /// wins.
    pub fn from_currencies(currencies: impl IntoIterator<Item = Currency>) -> Self {
        let mut resolver = Self::default();
        for currency in currencies {
            if currency.is_unknown() || resolver.by_symbol.contains_key(currency.symbol()) {
                trace!("Skipping duplicate or empty listing entry '{currency}'");
                continue;
            }
            resolver
                .by_symbol
                .insert(currency.symbol().to_string(), resolver.currencies.len());
            resolver.currencies.push(currency);
        }
        resolver
    }

    /// A resolver that knows no currencies, for formats that never need to look one up.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    /// Looks up `symbol` after applying the alias table. `None` means the symbol is not listed.
    pub fn resolve(&self, symbol: &str) -> Option<&Currency> {
        let symbol = canonical_symbol(symbol.trim());
        self.by_symbol
            .get(symbol)
            .and_then(|&ix| self.currencies.get(ix))
    }

    /// Splits a market code such as `ETHBTC` into its `(base, quote)` currencies.
    ///
    /// Every split point is a candidate and a candidate is valid when both halves resolve. When
    /// more than one candidate is valid, the one containing the longest resolved symbol wins, and
    /// on equal length the one with the longer quote wins. The result therefore does not depend on
    /// the order of the listing.
    pub fn split_market(&self, market: &str) -> Option<(Currency, Currency)> {
        let market = market.trim();
        let mut best: Option<MarketSplit<'_>> = None;
        let mut valid = 0usize;

        for (ix, _) in market.char_indices().skip(1) {
            let (base_symbol, quote_symbol) = market.split_at(ix);
            let (Some(base), Some(quote)) =
                (self.resolve(base_symbol), self.resolve(quote_symbol))
            else {
                continue;
            };
            valid += 1;
            let candidate = MarketSplit {
                base,
                quote,
                longest: base_symbol.len().max(quote_symbol.len()),
                quote_len: quote_symbol.len(),
            };
            best = match best {
                Some(current) if current.rank() >= candidate.rank() => Some(current),
                _ => Some(candidate),
            };
        }

        if valid > 1 {
            if let Some(chosen) = &best {
                warn!(
                    "Market '{market}' can be split {valid} ways, using {}/{}",
                    chosen.base, chosen.quote
                );
            }
        }

        best.map(|split| (split.base.clone(), split.quote.clone()))
    }
}

struct MarketSplit<'a> {
    base: &'a Currency,
    quote: &'a Currency,
    longest: usize,
    quote_len: usize,
}

impl MarketSplit<'_> {
    fn rank(&self) -> (usize, usize) {
        (self.longest, self.quote_len)
    }
}
