//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures such as validation
/// and conflicting transitions. Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// The requested transition conflicts with current state (e.g. already paid).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

/// Reject a blank required string field.
pub fn require_non_blank(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// Minimal shape check for an email address used as a natural key.
pub fn require_email(field: &str, value: &str) -> DomainResult<()> {
    require_non_blank(field, value)?;
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(())
        }
        _ => Err(DomainError::validation(format!("{field} must be an email address"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_are_rejected() {
        assert!(require_non_blank("name", "   ").is_err());
        assert!(require_non_blank("name", "Pixel 7").is_ok());
    }

    #[test]
    fn email_shape() {
        assert!(require_email("email", "a@x.com").is_ok());
        assert!(require_email("email", "ax.com").is_err());
        assert!(require_email("email", "@x.com").is_err());
        assert!(require_email("email", "a@").is_err());
        assert!(require_email("email", "a@b@c").is_err());
    }
}
