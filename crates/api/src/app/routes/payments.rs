use std::sync::Arc;

use axum::{extract::Extension, Json};
use chrono::Utc;

use doyashop_infra::{InsertResult, IntentRequest};
use doyashop_sales::NewPayment;

use crate::app::dto::{ClientSecret, CreateIntentRequest, ValidJson};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// Create a card intent with the processor; only the client secret is returned.
pub async fn create_intent(
    Extension(services): Extension<Arc<AppServices>>,
    ValidJson(body): ValidJson<CreateIntentRequest>,
) -> Result<Json<ClientSecret>, ApiError> {
    let request = IntentRequest::for_price(body.price);
    let intent = services.gateway.create_intent(&request).await?;
    tracing::info!(intent_id = %intent.id, amount = request.amount, "payment intent created");

    Ok(Json(ClientSecret {
        client_secret: intent.client_secret,
    }))
}

pub async fn record(
    Extension(services): Extension<Arc<AppServices>>,
    ValidJson(body): ValidJson<NewPayment>,
) -> Result<Json<InsertResult>, ApiError> {
    Ok(Json(services.record_payment(body, Utc::now()).await?))
}
