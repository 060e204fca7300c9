//! Money and currency value types.
//!
//! All monetary amounts in the system are exact decimals tagged with the
//! currency they are denominated in. Arithmetic is only defined between
//! amounts of the same currency; a mismatch is an error at the call site,
//! never a silent conversion. Rounding (2 fractional digits, half-to-even)
//! happens at presentation boundaries only.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ServiceError;

/// ISO 4217 style currency code: exactly three ASCII uppercase letters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    pub fn new(code: &str) -> Result<Self, ServiceError> {
        let bytes = code.as_bytes();
        if bytes.len() == 3 && bytes.iter().all(u8::is_ascii_uppercase) {
            Ok(Currency([bytes[0], bytes[1], bytes[2]]))
        } else {
            Err(ServiceError::ValidationError(format!(
                "Invalid currency code: {}",
                code
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII uppercase.
        std::str::from_utf8(&self.0).unwrap_or("XXX")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.as_str().to_string()
    }
}

/// An exact decimal amount in a specific currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Adds two amounts of the same currency.
    pub fn checked_add(self, other: Money) -> Result<Money, ServiceError> {
        self.require_same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, self.currency))
    }

    /// Subtracts two amounts of the same currency.
    pub fn checked_sub(self, other: Money) -> Result<Money, ServiceError> {
        self.require_same_currency(other)?;
        Ok(Money::new(self.amount - other.amount, self.currency))
    }

    /// Multiplies by a quantity, for line totals. Exact, no rounding.
    pub fn times(self, quantity: i64) -> Money {
        Money::new(self.amount * Decimal::from(quantity), self.currency)
    }

    /// The amount rounded to 2 fractional digits, half-to-even.
    ///
    /// For presentation only. Aggregation always works on the exact amount.
    pub fn rounded_for_display(&self) -> Decimal {
        self.amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
    }

    fn require_same_currency(&self, other: Money) -> Result<(), ServiceError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(ServiceError::CurrencyMismatch(format!(
                "{} does not match {}",
                other.currency, self.currency
            )))
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.rounded_for_display(), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn usd() -> Currency {
        Currency::new("USD").expect("valid code")
    }

    fn eur() -> Currency {
        Currency::new("EUR").expect("valid code")
    }

    #[test]
    fn currency_rejects_malformed_codes() {
        assert!(Currency::new("usd").is_err());
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("USDX").is_err());
        assert!(Currency::new("U$D").is_err());
    }

    #[test]
    fn currency_round_trips_through_strings() {
        let currency: Currency = "KES".parse().expect("parse");
        assert_eq!(currency.as_str(), "KES");
        assert_eq!(String::from(currency), "KES");
    }

    #[test]
    fn same_currency_arithmetic_is_exact() {
        let a = Money::new(dec!(10.10), usd());
        let b = Money::new(dec!(0.20), usd());
        assert_eq!(a.checked_add(b).unwrap().amount(), dec!(10.30));
        assert_eq!(a.checked_sub(b).unwrap().amount(), dec!(9.90));
    }

    #[test]
    fn cross_currency_arithmetic_fails() {
        let a = Money::new(dec!(10.00), usd());
        let b = Money::new(dec!(10.00), eur());
        assert_matches!(a.checked_add(b), Err(ServiceError::CurrencyMismatch(_)));
        assert_matches!(a.checked_sub(b), Err(ServiceError::CurrencyMismatch(_)));
    }

    #[test]
    fn line_totals_multiply_exactly() {
        let unit = Money::new(dec!(150.00), usd());
        assert_eq!(unit.times(2).amount(), dec!(300.00));

        let odd = Money::new(dec!(33.335), usd());
        assert_eq!(odd.times(3).amount(), dec!(100.005));
    }

    #[test]
    fn display_rounding_is_half_to_even() {
        assert_eq!(Money::new(dec!(2.345), usd()).rounded_for_display(), dec!(2.34));
        assert_eq!(Money::new(dec!(2.355), usd()).rounded_for_display(), dec!(2.36));
        assert_eq!(Money::new(dec!(2.3449), usd()).rounded_for_display(), dec!(2.34));
    }

    #[test]
    fn negative_amounts_are_recognized() {
        assert!(Money::new(dec!(-0.01), usd()).is_negative());
        assert!(!Money::zero(usd()).is_negative());
    }
}
