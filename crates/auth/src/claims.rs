use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bearer token claims.
///
/// The token binds a client to an account email; timestamps are Unix seconds
/// (`iat` / `exp` as in any JWT).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account email the token was issued for.
    pub email: String,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(email: impl Into<String>, issued_at: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            email: email.into(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens before this, in [`crate::jwt`].
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.exp <= claims.iat {
        return Err(TokenError::Invalid("expiry is not after issue time".to_string()));
    }
    if now.timestamp() < claims.iat {
        return Err(TokenError::Invalid("token issued in the future".to_string()));
    }
    if now.timestamp() >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn window_checks() {
        let now = Utc::now();
        let claims = TokenClaims::new("a@x.com", now, Duration::hours(1));

        assert!(validate_claims(&claims, now).is_ok());
        assert!(validate_claims(&claims, now + Duration::minutes(59)).is_ok());
        assert_eq!(validate_claims(&claims, now + Duration::hours(1)), Err(TokenError::Expired));
        assert!(matches!(
            validate_claims(&claims, now - Duration::minutes(5)),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn inverted_window_is_invalid() {
        let now = Utc::now();
        let claims = TokenClaims {
            email: "a@x.com".to_string(),
            iat: now.timestamp(),
            exp: now.timestamp(),
        };
        assert!(matches!(validate_claims(&claims, now), Err(TokenError::Invalid(_))));
    }
}
