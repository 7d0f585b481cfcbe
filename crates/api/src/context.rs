use crate::app::errors::ApiError;

/// Authenticated identity for a request, attached by the authentication guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    email: String,
}

impl PrincipalContext {
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into() }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// An explicitly supplied email must name the caller.
    pub fn ensure_self(&self, claimed: Option<&str>) -> Result<(), ApiError> {
        match claimed.map(str::trim).filter(|c| !c.is_empty()) {
            Some(claimed) if claimed != self.email => Err(ApiError::Forbidden),
            _ => Ok(()),
        }
    }
}
