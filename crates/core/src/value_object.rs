//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Largest accepted price in major units (processor limit is 8 digits of cents).
pub const MAX_PRICE: f64 = 999_999.99;

/// A price in major currency units (e.g. dollars), as sent by clients.
///
/// Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl ValueObject for Price {}

impl Price {
    pub fn new(value: f64) -> DomainResult<Self> {
        if !value.is_finite() {
            return Err(DomainError::validation("price must be a finite number"));
        }
        if value <= 0.0 {
            return Err(DomainError::validation("price must be greater than zero"));
        }
        if value > MAX_PRICE {
            return Err(DomainError::validation(format!(
                "price must not exceed {MAX_PRICE}"
            )));
        }
        Ok(Self(value))
    }

    /// Amount in minor units (cents): `price * 100`, rounded to the nearest integer.
    pub fn to_minor_units(&self) -> i64 {
        (self.0 * 100.0).round() as i64
    }
}

impl TryFrom<f64> for Price {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for f64 {
    fn from(value: Price) -> Self {
        value.0
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn converts_to_cents() {
        assert_eq!(Price::new(19.99).unwrap().to_minor_units(), 1999);
        assert_eq!(Price::new(250.0).unwrap().to_minor_units(), 25_000);
        assert_eq!(Price::new(0.01).unwrap().to_minor_units(), 1);
    }

    #[test]
    fn rejects_non_positive_and_non_finite() {
        assert!(Price::new(0.0).is_err());
        assert!(Price::new(-5.0).is_err());
        assert!(Price::new(f64::NAN).is_err());
        assert!(Price::new(f64::INFINITY).is_err());
        assert!(Price::new(MAX_PRICE + 1.0).is_err());
    }

    #[test]
    fn deserialization_validates() {
        assert!(serde_json::from_str::<Price>("12.5").is_ok());
        assert!(serde_json::from_str::<Price>("-1").is_err());
    }

    proptest! {
        #[test]
        fn whole_cent_prices_convert_exactly(cents in 1i64..=99_999_999i64) {
            let price = Price::new(cents as f64 / 100.0).unwrap();
            prop_assert_eq!(price.to_minor_units(), cents);
        }
    }
}
