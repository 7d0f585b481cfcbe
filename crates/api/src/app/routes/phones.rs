//! Listing routes. Status changes are seller-only field updates.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use chrono::Utc;
use serde_json::Value;

use doyashop_catalog::{AdFlag, Listing, ListingQuery, NewListing, StockStatus};
use doyashop_core::DocumentId;
use doyashop_infra::{Document, Filter, InsertResult, UpdateResult, Upsert};
use doyashop_sales::Booking;

use crate::app::dto::{self, EmailQuery, ValidJson};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn advertised(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let filter = Filter::from_criteria(ListingQuery::Advertised.criteria());
    Ok(Json(services.listings.find(&filter).await?))
}

pub async fn own_listings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    principal.ensure_self(query.email())?;
    let query = ListingQuery::BySeller(principal.email().to_string());
    let filter = Filter::from_criteria(query.criteria());
    Ok(Json(services.listings.find(&filter).await?))
}

/// Reads the bookings collection despite the path; kept for existing clients.
pub async fn booking_by_id(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Booking>>, ApiError> {
    let id = dto::parse_id(&id, "booking")?;
    Ok(Json(services.bookings.get(id).await?))
}

pub async fn mark_sold(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<UpdateResult>, ApiError> {
    let status = StockStatus::Sold.into();
    set_listing_field(&services, &id, Listing::STOCK_STATUS, status, Upsert::MatchOnly).await
}

pub async fn mark_unsold(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<UpdateResult>, ApiError> {
    let status = StockStatus::Unsold.into();
    set_listing_field(&services, &id, Listing::STOCK_STATUS, status, Upsert::MatchOnly).await
}

/// Flag a listing as advertised. Creates a placeholder when the id is unknown.
pub async fn advertise(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<UpdateResult>, ApiError> {
    let flag = AdFlag::Add.into();
    set_listing_field(&services, &id, Listing::IS_AD, flag, Upsert::CreateIfAbsent).await
}

async fn set_listing_field(
    services: &AppServices,
    raw_id: &str,
    field: &str,
    value: Value,
    upsert: Upsert,
) -> Result<Json<UpdateResult>, ApiError> {
    let id = dto::parse_id(raw_id, "listing")?;

    let mut fields = Document::new();
    fields.insert(field.to_string(), value);

    let result = services.listings.set_fields(&Filter::by_id(id), fields, upsert).await?;
    tracing::info!(listing_id = %id, field, matched = result.matched_count, "listing updated");
    Ok(Json(result))
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ValidJson(body): ValidJson<NewListing>,
) -> Result<Json<InsertResult>, ApiError> {
    principal.ensure_self(body.email.as_deref())?;

    let listing = Listing::create(DocumentId::new(), principal.email(), body, Utc::now())?;
    Ok(Json(services.listings.insert(&listing).await?))
}
