use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use doyashop_auth::JwtIssuer;

use crate::app::dto::{AccessToken, EmailQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub async fn liveness() -> &'static str {
    "Server is ready to fight"
}

/// Issue a bearer token for a registered email.
///
/// Unknown (or missing) emails get `403 {"accessToken": ""}`.
pub async fn issue_token(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<EmailQuery>,
) -> Result<Response, ApiError> {
    let account = match query.email() {
        Some(email) => services.account_by_email(email).await?,
        None => None,
    };

    let Some(account) = account else {
        tracing::debug!("token requested for unknown email");
        return Ok((
            StatusCode::FORBIDDEN,
            Json(AccessToken {
                access_token: String::new(),
            }),
        )
            .into_response());
    };

    let access_token = services.jwt.issue(&account.email, Utc::now())?;
    Ok(Json(AccessToken { access_token }).into_response())
}
