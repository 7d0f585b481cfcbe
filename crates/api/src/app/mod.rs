//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store collections, token service and payment gateway
//! - `routes/`: HTTP handlers, one file per resource, plus the guarded route table
//! - `dto.rs`: request/response DTOs and the validating JSON extractor
//! - `errors.rs`: error type and consistent error responses

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, Extension, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use doyashop_auth::{JwtValidator, Role};

use crate::middleware::{self, AuthState, RoleState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: AppServices) -> Router {
    let services = Arc::new(services);

    let jwt: Arc<dyn JwtValidator> = services.jwt.clone();
    let auth = from_fn_with_state(AuthState { jwt }, middleware::auth_middleware);
    let seller_guard = RoleState {
        accounts: services.accounts.clone(),
        required: Role::Seller,
    };
    let admin_guard = RoleState {
        accounts: services.accounts.clone(),
        required: Role::Admin,
    };

    // `route_layer` wraps outside-in: the last layer added runs first, so
    // authentication always precedes the role check.
    let authenticated = routes::authenticated().route_layer(auth.clone());
    let seller = routes::seller()
        .route_layer(from_fn_with_state(seller_guard, middleware::role_middleware))
        .route_layer(auth.clone());
    let admin = routes::admin()
        .route_layer(from_fn_with_state(admin_guard, middleware::role_middleware))
        .route_layer(auth);

    routes::public()
        .merge(authenticated)
        .merge(seller)
        .merge(admin)
        .layer(Extension(services))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
