//! Payment processor port.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use doyashop_core::Price;

pub mod stripe;

pub use stripe::StripeGateway;

pub const DEFAULT_CURRENCY: &str = "usd";
pub const CARD_PAYMENT_METHOD: &str = "card";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("payment processor is not configured")]
    NotConfigured,

    #[error("payment processor transport error: {0}")]
    Transport(String),

    #[error("payment processor rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("payment processor returned an unreadable response: {0}")]
    Decode(String),
}

/// Charge intent to create with the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub payment_method_types: Vec<String>,
}

impl IntentRequest {
    /// Card intent in the default currency for `price`.
    pub fn for_price(price: Price) -> Self {
        Self {
            amount: price.to_minor_units(),
            currency: DEFAULT_CURRENCY.to_string(),
            payment_method_types: vec![CARD_PAYMENT_METHOD.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a charge intent. No retries: a failure is final for the caller.
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_becomes_card_intent_in_minor_units() {
        let request = IntentRequest::for_price(Price::new(19.99).unwrap());
        assert_eq!(request.amount, 1999);
        assert_eq!(request.currency, "usd");
        assert_eq!(request.payment_method_types, vec!["card".to_string()]);
    }
}
