//! Reqwest-backed Stripe adapter.
//!
//! Owns transport details only: form encoding of the intent, bearer
//! authentication, HTTP error mapping, and decoding of the created intent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use super::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const PAYMENT_INTENTS_PATH: &str = "/v1/payment_intents";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Payment gateway that creates intents through the Stripe REST API.
pub struct StripeGateway {
    client: Client,
    endpoint: Url,
    secret: Option<String>,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("endpoint", &self.endpoint.as_str())
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

impl StripeGateway {
    /// Build a gateway against `api_base`. Without a secret every intent fails
    /// with `NotConfigured`.
    pub fn new(api_base: &str, secret: Option<String>) -> Result<Self, GatewayError> {
        Self::with_timeout(api_base, secret, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        api_base: &str,
        secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let endpoint = Url::parse(api_base)
            .and_then(|base| base.join(PAYMENT_INTENTS_PATH))
            .map_err(|e| {
                GatewayError::Transport(format!("invalid payment API base '{api_base}': {e}"))
            })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            secret: secret.filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let secret = self.secret.as_deref().ok_or(GatewayError::NotConfigured)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(secret)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form_fields(request))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        serde_json::from_slice(body.as_ref()).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

fn form_fields(request: &IntentRequest) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("amount", request.amount.to_string()),
        ("currency", request.currency.clone()),
    ];
    fields.extend(
        request
            .payment_method_types
            .iter()
            .map(|method| ("payment_method_types[]", method.clone())),
    );
    fields
}

fn map_status_error(status: StatusCode, body: &[u8]) -> GatewayError {
    GatewayError::Rejected {
        status: status.as_u16(),
        message: error_message(body),
    }
}

/// Stripe reports failures as `{"error": {"message": ...}}`.
fn error_message(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| String::from_utf8_lossy(body).chars().take(PREVIEW_CHAR_LIMIT).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use doyashop_core::Price;

    #[test]
    fn form_encodes_amount_currency_and_card() {
        let fields = form_fields(&IntentRequest::for_price(Price::new(12.5).unwrap()));
        assert_eq!(
            fields,
            vec![
                ("amount", "1250".to_string()),
                ("currency", "usd".to_string()),
                ("payment_method_types[]", "card".to_string()),
            ]
        );
    }

    #[test]
    fn rejection_surfaces_processor_message() {
        let body = br#"{"error": {"message": "Invalid API Key provided", "type": "invalid"}}"#;
        assert_eq!(
            map_status_error(StatusCode::UNAUTHORIZED, body),
            GatewayError::Rejected {
                status: 401,
                message: "Invalid API Key provided".to_string()
            }
        );
        assert!(matches!(
            map_status_error(StatusCode::BAD_GATEWAY, b"upstream down"),
            GatewayError::Rejected { status: 502, message } if message == "upstream down"
        ));
    }

    #[test]
    fn endpoint_joins_base() {
        let gateway =
            StripeGateway::new("http://127.0.0.1:9999", Some("sk_test".to_string())).unwrap();
        assert_eq!(gateway.endpoint.as_str(), "http://127.0.0.1:9999/v1/payment_intents");
        assert!(StripeGateway::new("not a url", None).is_err());
    }

    #[tokio::test]
    async fn missing_secret_fails_without_calling_out() {
        let gateway = StripeGateway::new(DEFAULT_API_BASE, Some("  ".to_string())).unwrap();
        assert!(!gateway.is_configured());

        let err = gateway
            .create_intent(&IntentRequest::for_price(Price::new(1.0).unwrap()))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::NotConfigured);
    }
}
