use crate::model::Currency;
use rust_decimal::Decimal;
use std::fmt::{Display, Formatter};
use std::ops::Deref;

/// An amount of a currency.
///
/// Amounts are magnitudes. Whether a position was given or received follows from the kind of
/// record that holds it, not from its sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Position {
    amount: Decimal,
    currency: Currency,
}

impl Position {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// The cost of a trade or transfer.
///
/// A fee may be zero (waived) or negative (a rebate), and its currency is `Currency::unknown()`
/// when the source does not report it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Fee(Position);

impl Fee {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self(Position::new(amount, currency))
    }

    /// A fee of nothing, charged in `currency`.
    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }
}

impl Deref for Fee {
    type Target = Position;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Fee {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
