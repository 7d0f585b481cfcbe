use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    Json,
};
use chrono::Utc;

use doyashop_core::DocumentId;
use doyashop_infra::{Filter, InsertResult};
use doyashop_sales::{Booking, NewBooking};

use crate::app::dto::{EmailQuery, ValidJson};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn list_for_email(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    let email = query
        .email()
        .ok_or_else(|| ApiError::Validation("email query parameter is required".to_string()))?;
    let filter = Filter::all().eq(Booking::EMAIL, email);
    Ok(Json(services.bookings.find(&filter).await?))
}

/// Bookings are always placed for the caller and start unpaid.
pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ValidJson(body): ValidJson<NewBooking>,
) -> Result<Json<InsertResult>, ApiError> {
    principal.ensure_self(body.email.as_deref())?;

    let booking = Booking::place(DocumentId::new(), principal.email(), body, Utc::now())?;
    tracing::info!(booking_id = %booking.id, listing_id = %booking.listing_id, "booking placed");
    Ok(Json(services.bookings.insert(&booking).await?))
}
