//! Monetary amounts with lenient input coercion
//!
//! Fee and quotation fields are non-negative decimal amounts. Input that
//! cannot be read as a non-negative number never rejects a submission: it is
//! coerced to zero. The coercion lives here so the form path, the bulk JSON
//! path and any direct caller all share exactly one rule.
//!
//! # Example
//!
//! ```rust,ignore
//! use core_kernel::Amount;
//!
//! assert_eq!(Amount::parse_lenient("1,500.00").value(), dec!(1500.00));
//! assert!(Amount::parse_lenient("abc").is_zero());
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of decimal places amounts are stored with
pub const AMOUNT_SCALE: u32 = 2;

/// A non-negative monetary amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Creates an amount from a decimal, clamping negatives to zero
    pub fn new(value: Decimal) -> Self {
        if value.is_sign_negative() {
            Self::ZERO
        } else {
            Self(value.round_dp(AMOUNT_SCALE))
        }
    }

    /// Parses free-form user input.
    ///
    /// Thousands separators and surrounding whitespace are ignored. Anything
    /// negative, non-finite or unparseable becomes zero.
    pub fn parse_lenient(input: &str) -> Self {
        let cleaned: String = input
            .trim()
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();

        if cleaned.is_empty() {
            return Self::ZERO;
        }

        if let Ok(value) = Decimal::from_str(&cleaned) {
            return Self::new(value);
        }

        // Exponent forms such as "1e3" only parse as floats
        match cleaned.parse::<f64>() {
            Ok(value) if value.is_finite() => Decimal::from_f64_retain(value)
                .map(Self::new)
                .unwrap_or(Self::ZERO),
            _ => Self::ZERO,
        }
    }

    /// Coerces an arbitrary JSON value (number, string or null)
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(number) => Self::parse_lenient(&number.to_string()),
            serde_json::Value::String(text) => Self::parse_lenient(text),
            _ => Self::ZERO,
        }
    }

    /// Returns the underlying decimal
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0.to_f64().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for Amount {
    /// Accepts numbers, numeric strings and null; everything else coerces to zero
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_thousands_separator_is_stripped() {
        assert_eq!(Amount::parse_lenient("1,500.00").value(), dec!(1500.00));
    }

    #[test]
    fn test_garbage_coerces_to_zero() {
        assert_eq!(Amount::parse_lenient("abc"), Amount::ZERO);
        assert_eq!(Amount::parse_lenient(""), Amount::ZERO);
        assert_eq!(Amount::parse_lenient("nan"), Amount::ZERO);
        assert_eq!(Amount::parse_lenient("inf"), Amount::ZERO);
    }

    #[test]
    fn test_negative_coerces_to_zero() {
        assert_eq!(Amount::parse_lenient("-12.50"), Amount::ZERO);
    }

    #[test]
    fn test_exponent_form() {
        assert_eq!(Amount::parse_lenient("1e3").value(), dec!(1000));
    }

    #[test]
    fn test_deserialize_from_string_and_number() {
        let from_text: Amount = serde_json::from_str("\"abc\"").unwrap();
        let from_number: Amount = serde_json::from_str("250.5").unwrap();
        let from_null: Amount = serde_json::from_str("null").unwrap();

        assert!(from_text.is_zero());
        assert_eq!(from_number.value(), dec!(250.50));
        assert!(from_null.is_zero());
    }

    #[test]
    fn test_display_has_two_places() {
        assert_eq!(Amount::parse_lenient("12").to_string(), "12.00");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lenient_parse_never_goes_negative(input in ".*") {
            let amount = Amount::parse_lenient(&input);
            prop_assert!(!amount.value().is_sign_negative());
        }

        #[test]
        fn whole_cents_survive_formatting(cents in 0i64..10_000_000_000i64) {
            let amount = Amount::new(Decimal::new(cents, 2));
            prop_assert_eq!(Amount::parse_lenient(&amount.to_string()), amount);
        }
    }
}
