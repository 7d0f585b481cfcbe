use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use doyashop_core::{DocumentId, Price};

use crate::app::errors::ApiError;

// -------------------------
// Extractors
// -------------------------

/// JSON body whose rejections are reported as structured validation errors.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Parse a path id, reporting `what` on failure.
pub fn parse_id(raw: &str, what: &str) -> Result<DocumentId, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::invalid_id(what))
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

impl EmailQuery {
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub price: Price,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCheck {
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerCheck {
    pub is_seller: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSecret {
    pub client_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_email_query_counts_as_absent() {
        let query = EmailQuery {
            email: Some("  ".to_string()),
        };
        assert_eq!(query.email(), None);
        assert_eq!(EmailQuery::default().email(), None);
    }

    #[test]
    fn invalid_path_id_is_rejected() {
        assert!(matches!(parse_id("not-a-uuid", "booking"), Err(ApiError::InvalidId(_))));
        let id = DocumentId::new();
        assert_eq!(parse_id(&id.to_string(), "booking").unwrap(), id);
    }

    #[test]
    fn role_checks_use_wire_names() {
        assert_eq!(
            serde_json::to_value(AdminCheck { is_admin: false }).unwrap(),
            serde_json::json!({"isAdmin": false})
        );
        assert_eq!(
            serde_json::to_value(AccessToken {
                access_token: String::new()
            })
            .unwrap(),
            serde_json::json!({"accessToken": ""})
        );
    }
}
