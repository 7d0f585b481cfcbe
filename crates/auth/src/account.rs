//! Account documents: identity record keyed by email, carrying role and status.

use serde::{Deserialize, Serialize};

use doyashop_core::{require_email, DocumentId, DomainError, DomainResult, Entity};

use crate::Role;

/// Verification status set by an admin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Unverified,
    Verified,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Unverified => "unverified",
            AccountStatus::Verified => "verified",
        }
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored account document.
///
/// Everything except `_id` is defaulted on read: verifying an unknown id
/// creates a placeholder document holding only `_id` and `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Account {
    pub const EMAIL: &'static str = "email";
    pub const ROLE: &'static str = "role";
    pub const STATUS: &'static str = "status";

    /// Build a new account from a self-registration request.
    ///
    /// The admin role cannot be self-assigned; status always starts unverified.
    pub fn register(id: DocumentId, req: RegisterAccount) -> DomainResult<Self> {
        require_email("email", &req.email)?;
        let role = req.role.unwrap_or_default();
        if role == Role::Admin {
            return Err(DomainError::validation("admin role cannot be self-assigned"));
        }

        Ok(Self {
            id,
            name: req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            email: req.email.trim().to_string(),
            role,
            status: AccountStatus::Unverified,
            photo_url: req.photo_url,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }
}

impl Entity for Account {
    fn id(&self) -> DocumentId {
        self.id
    }
}

/// Self-registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAccount {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub photo_url: Option<String>,
}
