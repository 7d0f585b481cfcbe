use thiserror::Error;

use crate::{Account, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: no account for the authenticated identity")]
    UnknownAccount,

    #[error("forbidden: role '{actual}' does not satisfy required role '{required}'")]
    RoleMismatch { required: Role, actual: Role },
}

/// Role check for an authenticated identity.
///
/// - No IO: the caller loads the account for the token's email.
/// - Exact match: an admin does not implicitly pass a seller check.
pub fn authorize_role(account: Option<&Account>, required: Role) -> Result<(), AuthzError> {
    let account = account.ok_or(AuthzError::UnknownAccount)?;
    if account.role == required {
        Ok(())
    } else {
        Err(AuthzError::RoleMismatch {
            required,
            actual: account.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doyashop_core::DocumentId;
    use proptest::prelude::*;

    fn account(role: Role) -> Account {
        Account {
            id: DocumentId::new(),
            name: None,
            email: "a@x.com".to_string(),
            role,
            status: Default::default(),
            photo_url: None,
        }
    }

    #[test]
    fn missing_account_is_forbidden() {
        assert_eq!(authorize_role(None, Role::Admin), Err(AuthzError::UnknownAccount));
    }

    #[test]
    fn admin_does_not_pass_seller_guard() {
        let admin = account(Role::Admin);
        assert!(authorize_role(Some(&admin), Role::Admin).is_ok());
        assert_eq!(
            authorize_role(Some(&admin), Role::Seller),
            Err(AuthzError::RoleMismatch {
                required: Role::Seller,
                actual: Role::Admin
            })
        );
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn granted_iff_roles_match(actual in any_role(), required in any_role()) {
            let acc = account(actual);
            prop_assert_eq!(authorize_role(Some(&acc), required).is_ok(), actual == required);
        }
    }
}
