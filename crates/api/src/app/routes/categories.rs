use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    Json,
};

use doyashop_catalog::{Category, CategoryName, Listing, ListingQuery, NewCategory};
use doyashop_core::DocumentId;
use doyashop_infra::{Filter, InsertResult};

use crate::app::dto::{self, ValidJson};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(services.categories.find(&Filter::all()).await?))
}

/// `{_id, name}` pairs for the listing form.
pub async fn names(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<CategoryName>>, ApiError> {
    let categories = services.categories.find(&Filter::all()).await?;
    Ok(Json(categories.iter().map(Category::name_only).collect()))
}

/// Unsold listings in one category.
pub async fn listings_in_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let category_id = dto::parse_id(&id, "category")?;
    let query = ListingQuery::UnsoldInCategory(category_id);
    Ok(Json(services.listings.find(&Filter::from_criteria(query.criteria())).await?))
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    ValidJson(body): ValidJson<NewCategory>,
) -> Result<Json<InsertResult>, ApiError> {
    let category = Category::create(DocumentId::new(), body)?;
    tracing::info!(category_id = %category.id, name = %category.name, "category created");
    Ok(Json(services.categories.insert(&category).await?))
}
