//! Process configuration, read from the environment at startup.

use std::env;

use thiserror::Error;

use crate::payments::stripe::DEFAULT_API_BASE;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
/// Longest accepted token lifetime (30 days).
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;
const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be positive")]
    NotPositive { key: &'static str },

    #[error("{key} must not exceed {max}")]
    TooLarge { key: &'static str, max: i64 },
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub stripe_secret: Option<String>,
    pub payment_api_base: String,
    pub database_url: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("stripe_configured", &self.stripe_secret.is_some())
            .field("payment_api_base", &self.payment_api_base)
            .field("database", &self.database_url.as_ref().map(|_| "postgres"))
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidNumber {
                        key: "PORT",
                        value: raw,
                    })?
            }
            None => DEFAULT_PORT,
        };

        let token_ttl_secs = match get("TOKEN_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "TOKEN_TTL_SECS",
                    value: raw,
                })?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };
        if token_ttl_secs <= 0 {
            return Err(ConfigError::NotPositive {
                key: "TOKEN_TTL_SECS",
            });
        }
        if token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::TooLarge {
                key: "TOKEN_TTL_SECS",
                max: MAX_TOKEN_TTL_SECS,
            });
        }

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, using insecure development secret");
            DEV_JWT_SECRET.to_string()
        });

        let database_url = get("DATABASE_URL");
        if database_url.is_none() {
            tracing::warn!("DATABASE_URL not set, documents are kept in memory only");
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port,
            jwt_secret,
            token_ttl_secs,
            stripe_secret: get("STRIPE_SECRET"),
            payment_api_base: get("PAYMENT_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            database_url,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.listen_addr(), "0.0.0.0:5000");
        assert_eq!(cfg.token_ttl_secs, 3600);
        assert_eq!(cfg.payment_api_base, "https://api.stripe.com");
        assert!(cfg.stripe_secret.is_none());
        assert!(cfg.database_url.is_none());
        assert!(!cfg.jwt_secret.is_empty());
    }

    #[test]
    fn values_are_read_from_lookup() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("JWT_SECRET", "s3cret"),
            ("STRIPE_SECRET", "sk_test_1"),
            ("DATABASE_URL", "postgres://localhost/doyashop"),
            ("TOKEN_TTL_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.stripe_secret.as_deref(), Some("sk_test_1"));
        assert_eq!(cfg.token_ttl_secs, 60);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        assert_eq!(
            config(&[("PORT", "http")]),
            Err(ConfigError::InvalidNumber {
                key: "PORT",
                value: "http".to_string()
            })
        );
        assert_eq!(
            config(&[("TOKEN_TTL_SECS", "0")]),
            Err(ConfigError::NotPositive {
                key: "TOKEN_TTL_SECS"
            })
        );
    }

    #[test]
    fn token_ttl_is_capped() {
        let max = MAX_TOKEN_TTL_SECS.to_string();
        let cfg = config(&[("TOKEN_TTL_SECS", max.as_str())]).unwrap();
        assert_eq!(cfg.token_ttl_secs, MAX_TOKEN_TTL_SECS);

        // Large enough to overflow a millisecond duration.
        let huge = (i64::MAX / 1000 + 1).to_string();
        for raw in [huge.as_str(), "2592001"] {
            assert_eq!(
                config(&[("TOKEN_TTL_SECS", raw)]),
                Err(ConfigError::TooLarge {
                    key: "TOKEN_TTL_SECS",
                    max: MAX_TOKEN_TTL_SECS
                })
            );
        }
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = config(&[("JWT_SECRET", "s3cret"), ("STRIPE_SECRET", "sk_live_x")]).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("sk_live_x"));
    }
}
