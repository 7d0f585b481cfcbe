//! `doyashop-auth`: identity tokens and role-based authorization.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers hand it
//! the account they loaded and the token string they received.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod roles;

pub use account::{Account, AccountStatus, RegisterAccount};
pub use authorize::{authorize_role, AuthzError};
pub use claims::{validate_claims, TokenClaims, TokenError};
pub use jwt::{Hs256Jwt, JwtIssuer, JwtValidator};
pub use roles::Role;
