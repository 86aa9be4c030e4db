//! Exact base-10 decimal arithmetic for monetary fields.
//!
//! All amounts, quantities and prices in the domain go through this wrapper
//! rather than raw floats. Arithmetic is checked and result-returning because
//! division must be able to signal a zero divisor.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal as Inner, RoundingStrategy};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecimalError {
    #[error("invalid decimal string: {0}")]
    InvalidDecimal(String),

    #[error("division by zero")]
    DivByZero,

    #[error("decimal overflow in {0}")]
    Overflow(&'static str),
}

/// Base-10 decimal with 28 significant digits and half-up rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Decimal(Inner);

impl Decimal {
    pub const ZERO: Decimal = Decimal(Inner::ZERO);

    pub fn from_i64(value: i64) -> Self {
        Decimal(Inner::from(value))
    }

    /// Lossy construction from an IEEE double, used when scanning numeric
    /// database columns. Returns None for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        Inner::from_f64_retain(value).map(Decimal)
    }

    pub fn hundred() -> Self {
        Decimal(Inner::ONE_HUNDRED)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(self, other: Decimal) -> Result<Decimal, DecimalError> {
        self.0
            .checked_add(other.0)
            .map(Decimal)
            .ok_or(DecimalError::Overflow("add"))
    }

    pub fn sub(self, other: Decimal) -> Result<Decimal, DecimalError> {
        self.0
            .checked_sub(other.0)
            .map(Decimal)
            .ok_or(DecimalError::Overflow("sub"))
    }

    pub fn mul(self, other: Decimal) -> Result<Decimal, DecimalError> {
        self.0
            .checked_mul(other.0)
            .map(Decimal)
            .ok_or(DecimalError::Overflow("mul"))
    }

    pub fn div(self, other: Decimal) -> Result<Decimal, DecimalError> {
        if other.is_zero() {
            return Err(DecimalError::DivByZero);
        }
        self.0
            .checked_div(other.0)
            .map(Decimal)
            .ok_or(DecimalError::Overflow("div"))
    }

    /// Rounds to `places` decimal places, halves away from zero.
    pub fn round(self, places: u32) -> Decimal {
        Decimal(
            self.0
                .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    pub fn abs(self) -> Decimal {
        Decimal(self.0.abs())
    }
}

impl From<Inner> for Decimal {
    fn from(value: Inner) -> Self {
        Decimal(value)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // rust_decimal renders plain decimal notation, never scientific.
        self.0.fmt(f)
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Inner::from_str(s)
            .or_else(|_| Inner::from_scientific(s))
            .map(Decimal)
            .map_err(|_| DecimalError::InvalidDecimal(s.to_string()))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Emit a bare JSON number; arbitrary_precision keeps the literal exact.
        let number = serde_json::Number::from_str(&self.0.to_string())
            .map_err(serde::ser::Error::custom)?;
        number.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let text = match &value {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            other => {
                return Err(D::Error::custom(format!(
                    "expected a decimal number or string, got {other}"
                )))
            }
        };
        text.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_format_round_trip() {
        for text in ["0", "150", "-3.25", "0.0001", "12345678901234567890"] {
            let parsed: Decimal = text.parse().unwrap();
            assert_eq!(parsed.to_string(), text);
            assert_eq!(parsed.to_string().parse::<Decimal>().unwrap(), parsed);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "not-a-number".parse::<Decimal>(),
            Err(DecimalError::InvalidDecimal(_))
        ));
        assert!("".parse::<Decimal>().is_err());
    }

    #[test]
    fn test_parse_accepts_scientific_input() {
        let parsed: Decimal = "1.5e3".parse().unwrap();
        assert_eq!(parsed, Decimal::from(dec!(1500)));
        // Output stays plain.
        assert_eq!(parsed.to_string(), "1500");
    }

    #[test]
    fn test_division_by_zero() {
        let one = Decimal::from_i64(1);
        assert_eq!(one.div(Decimal::ZERO), Err(DecimalError::DivByZero));
    }

    #[test]
    fn test_zero_divided_by_non_zero_is_zero() {
        let result = Decimal::ZERO.div(Decimal::from_i64(7)).unwrap();
        assert!(result.is_zero());
    }

    #[test]
    fn test_arithmetic() {
        let a = Decimal::from(dec!(10.5));
        let b = Decimal::from(dec!(2));
        assert_eq!(a.add(b).unwrap(), Decimal::from(dec!(12.5)));
        assert_eq!(a.sub(b).unwrap(), Decimal::from(dec!(8.5)));
        assert_eq!(a.mul(b).unwrap(), Decimal::from(dec!(21)));
        assert_eq!(a.div(b).unwrap(), Decimal::from(dec!(5.25)));
    }

    #[test]
    fn test_round_half_up() {
        let value: Decimal = "2.345".parse().unwrap();
        assert_eq!(value.round(2), Decimal::from(dec!(2.35)));

        let negative: Decimal = "-2.345".parse().unwrap();
        assert_eq!(negative.round(2), Decimal::from(dec!(-2.35)));
    }

    #[test]
    fn test_ordering_ignores_scale() {
        let a: Decimal = "1.50".parse().unwrap();
        let b: Decimal = "1.5".parse().unwrap();
        assert_eq!(a, b);
        assert!(a < "2".parse().unwrap());
        assert!(a > "-2".parse().unwrap());
    }

    #[test]
    fn test_json_emits_bare_number() {
        let value: Decimal = "150.25".parse().unwrap();
        assert_eq!(serde_json::to_string(&value).unwrap(), "150.25");
    }

    #[test]
    fn test_json_accepts_number_and_string() {
        let from_number: Decimal = serde_json::from_str("150.25").unwrap();
        let from_string: Decimal = serde_json::from_str("\"150.25\"").unwrap();
        assert_eq!(from_number, from_string);
        assert!(serde_json::from_str::<Decimal>("true").is_err());
    }
}
