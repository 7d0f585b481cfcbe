//! Account routes: registration, role checks, verification and admin listing.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    Json,
};

use doyashop_auth::{Account, AccountStatus, RegisterAccount, Role};
use doyashop_core::DocumentId;
use doyashop_infra::{
    DeleteResult, Document, Filter, InsertResult, StoreError, UpdateResult, Upsert,
};

use crate::app::dto::{self, AdminCheck, EmailQuery, SellerCheck, ValidJson};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// `isAdmin` UI hint. Unknown emails are simply not admins.
pub async fn is_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Path(email): Path<String>,
) -> Result<Json<AdminCheck>, ApiError> {
    let account = services.account_by_email(&email).await?;
    Ok(Json(AdminCheck {
        is_admin: account.is_some_and(|a| a.is_admin()),
    }))
}

pub async fn is_seller(
    Extension(services): Extension<Arc<AppServices>>,
    Path(email): Path<String>,
) -> Result<Json<SellerCheck>, ApiError> {
    let account = services.account_by_email(&email).await?;
    Ok(Json(SellerCheck {
        is_seller: account.is_some_and(|a| a.is_seller()),
    }))
}

pub async fn own_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Option<Account>>, ApiError> {
    principal.ensure_self(query.email())?;
    Ok(Json(services.account_by_email(principal.email()).await?))
}

pub async fn list_all(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(services.accounts.find(&Filter::all()).await?))
}

pub async fn list_sellers(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Account>>, ApiError> {
    list_by_role(&services, Role::Seller).await
}

pub async fn list_buyers(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Account>>, ApiError> {
    list_by_role(&services, Role::Buyer).await
}

async fn list_by_role(
    services: &AppServices,
    role: Role,
) -> Result<Json<Vec<Account>>, ApiError> {
    let filter = Filter::all().eq(Account::ROLE, role.as_str());
    Ok(Json(services.accounts.find(&filter).await?))
}

/// Mark an account verified. Creates a placeholder when the id is unknown.
pub async fn verify(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<UpdateResult>, ApiError> {
    let id = dto::parse_id(&id, "account")?;

    let mut fields = Document::new();
    fields.insert(Account::STATUS.to_string(), AccountStatus::Verified.as_str().into());

    let result = services
        .accounts
        .set_fields(&Filter::by_id(id), fields, Upsert::CreateIfAbsent)
        .await?;
    tracing::info!(
        account_id = %id,
        upserted = result.upserted_id.is_some(),
        "account verified"
    );
    Ok(Json(result))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ValidJson(body): ValidJson<RegisterAccount>,
) -> Result<Json<InsertResult>, ApiError> {
    let account = Account::register(DocumentId::new(), body)?;
    let result = services
        .accounts
        .insert_unique(Account::EMAIL, &account)
        .await
        .map_err(|err| match err {
            StoreError::DuplicateKey(_) => {
                ApiError::Conflict(format!("an account for {} already exists", account.email))
            }
            other => other.into(),
        })?;

    tracing::info!(account_id = %result.inserted_id, role = %account.role, "account registered");
    Ok(Json(result))
}

pub async fn remove(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    let id = dto::parse_id(&id, "account")?;
    let result = services.accounts.delete_one(&Filter::by_id(id)).await?;
    tracing::info!(account_id = %id, deleted = result.deleted_count, "account deleted");
    Ok(Json(result))
}
