use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Symbols that a data source spells differently from the listing we resolve against. The left
/// side is the spelling found in exchange files, the right side is the listed symbol.
const SYMBOL_ALIASES: &[(&str, &str)] = &[("IOTA", "MIOTA")];

/// Returns the listed spelling of `symbol`, or `symbol` itself when it has no alias.
pub fn canonical_symbol(symbol: &str) -> &str {
    SYMBOL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == symbol)
        .map(|(_, listed)| *listed)
        .unwrap_or(symbol)
}

/// A currency, identified by its short symbol, e.g. `BTC`.
///
/// Two currencies are equal when their symbols are equal after alias normalization, so `IOTA`
/// and `MIOTA` are the same currency. The full name is informational only.
///
/// ```
/// # use deltaconv::model::Currency;
/// assert_eq!(Currency::new("IOTA"), Currency::with_name("MIOTA", "IOTA"));
/// assert_ne!(Currency::new("BTC"), Currency::new("BCH"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Currency {
    symbol: String,
    name: Option<String>,
}

impl Currency {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().trim().to_string(),
            name: None,
        }
    }

    pub fn with_name(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(symbol)
        }
    }

    /// The currency of a value whose source did not say which currency it is in.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_unknown(&self) -> bool {
        self.symbol.is_empty()
    }

    fn canonical(&self) -> &str {
        canonical_symbol(&self.symbol)
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Currency {}

impl Hash for Currency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state)
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.symbol)
    }
}
