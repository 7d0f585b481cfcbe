use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use doyashop_auth::TokenError;
use doyashop_core::DomainError;
use doyashop_infra::{GatewayError, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing bearer token")]
    Unauthenticated,

    #[error("forbidden access")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidId(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Upstream(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_id(what: &str) -> Self {
        Self::InvalidId(format!("invalid {what} id"))
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::InvalidId(msg) => Self::InvalidId(msg),
            DomainError::NotFound => Self::NotFound("not found".to_string()),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::Invalid(_) => Self::Forbidden,
            TokenError::Signing(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthenticated => {
                json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized access")
            }
            ApiError::Forbidden => {
                json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden access")
            }
            ApiError::Validation(msg) => {
                json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
            }
            ApiError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
            ApiError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
            ApiError::Upstream(err) => {
                tracing::warn!(error = %err, "payment processor call failed");
                json_error(StatusCode::BAD_GATEWAY, "upstream_error", err.to_string())
            }
            ApiError::Store(
                StoreError::DuplicateId(msg)
                | StoreError::DuplicateKey(msg)
                | StoreError::PreconditionFailed(msg),
            ) => json_error(StatusCode::CONFLICT, "conflict", msg),
            ApiError::Store(err) => {
                tracing::error!(error = %err, "store operation failed");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    "internal server error",
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "unhandled fault");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error",
                )
            }
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
            (ApiError::from(DomainError::validation("x")), StatusCode::BAD_REQUEST),
            (ApiError::invalid_id("booking"), StatusCode::BAD_REQUEST),
            (ApiError::from(DomainError::not_found()), StatusCode::NOT_FOUND),
            (ApiError::from(DomainError::conflict("paid")), StatusCode::CONFLICT),
            (ApiError::from(GatewayError::NotConfigured), StatusCode::BAD_GATEWAY),
            (
                ApiError::from(StoreError::PreconditionFailed("x".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(StoreError::DuplicateKey("email".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(StoreError::Backend("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::from(TokenError::Expired), StatusCode::FORBIDDEN),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
