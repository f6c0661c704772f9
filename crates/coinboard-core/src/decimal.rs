//! Precision-safe decimal types for market data.
//!
//! Uses `rust_decimal` for exact decimal arithmetic so that two quotes of the
//! same price always compare equal, which the change-direction logic relies on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// USD price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with percentages in comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Calculate percentage difference from another price.
    #[inline]
    pub fn pct_from(&self, other: Price) -> Option<Percent> {
        if other.is_zero() {
            return None;
        }
        Some(Percent((self.0 - other.0) / other.0 * Decimal::ONE_HUNDRED))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Signed percentage (e.g. 24h or 7d change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(pub Decimal);

impl Percent {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    /// Strictly positive change.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl From<Decimal> for Percent {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_parse_trims_whitespace() {
        let price: Price = " 29001.5012 ".parse().unwrap();
        assert_eq!(price, Price::new(dec!(29001.5012)));
    }

    #[test]
    fn test_price_parse_rejects_garbage() {
        assert!("n/a".parse::<Price>().is_err());
    }

    #[test]
    fn test_price_equality_ignores_trailing_zeros() {
        let a: Price = "100.0".parse().unwrap();
        let b: Price = "100".parse().unwrap();
        assert_eq!(a, b);
        assert!(a <= b && a >= b);
    }

    #[test]
    fn test_price_pct_from() {
        let old = Price::new(dec!(100));
        let new = Price::new(dec!(105));
        assert_eq!(new.pct_from(old), Some(Percent::new(dec!(5))));
        assert_eq!(new.pct_from(Price::ZERO), None);
    }

    #[test]
    fn test_percent_sign() {
        assert!(Percent::new(dec!(0.3)).is_positive());
        assert!(!Percent::new(dec!(-0.3)).is_positive());
        assert!(!Percent::ZERO.is_positive());
    }
}
