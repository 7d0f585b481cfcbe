use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use doyashop_auth::{authorize_role, Account, JwtValidator, Role};
use doyashop_infra::{Collection, Filter};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Authentication guard: a valid bearer token is required.
///
/// No `Authorization` header is 401; anything present that does not verify
/// is 403.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(reason = %e, path = %req.uri().path(), "rejected bearer token");
        ApiError::Forbidden
    })?;

    req.extensions_mut().insert(PrincipalContext::new(claims.email));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(ApiError::Unauthenticated)?;

    let header = header.to_str().map_err(|_| ApiError::Forbidden)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Forbidden)?
        .trim();
    if token.is_empty() {
        return Err(ApiError::Forbidden);
    }

    Ok(token)
}

#[derive(Clone)]
pub struct RoleState {
    pub accounts: Collection<Account>,
    pub required: Role,
}

/// Role guard; must run after [`auth_middleware`].
///
/// The stored account for the token's email must hold exactly `required`.
pub async fn role_middleware(
    State(state): State<RoleState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = req
        .extensions()
        .get::<PrincipalContext>()
        .cloned()
        .ok_or(ApiError::Unauthenticated)?;

    let account = state
        .accounts
        .find_one(&Filter::all().eq(Account::EMAIL, principal.email()))
        .await?;

    authorize_role(account.as_ref(), state.required).map_err(|e| {
        tracing::debug!(reason = %e, path = %req.uri().path(), "role check failed");
        ApiError::Forbidden
    })?;

    Ok(next.run(req).await)
}
