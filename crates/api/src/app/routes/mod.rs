//! Route table, grouped by guard chain.
//!
//! Paths shared between groups (`/users`, `/users/admin/:id`, `/categories`,
//! `/bookings`) are merged per method, so each method keeps its own guards.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

pub mod bookings;
pub mod categories;
pub mod payments;
pub mod phones;
pub mod system;
pub mod users;

/// No guard.
pub fn public() -> Router {
    Router::new()
        .route("/", get(system::liveness))
        .route("/jwt", get(system::issue_token))
        .route("/users", post(users::register))
        .route("/users/admin/:id", get(users::is_admin).put(users::verify))
        .route("/categories", get(categories::list))
        .route("/categories/:id", get(categories::listings_in_category))
        .route("/phones/ads", get(phones::advertised))
        .route("/phones/:id", get(phones::booking_by_id))
        .route("/bookings", get(bookings::list_for_email))
        .route("/create-payment-intent", post(payments::create_intent))
        .route("/payments", post(payments::record))
}

/// Valid bearer token.
pub fn authenticated() -> Router {
    Router::new()
        .route("/users/seller/:email", get(users::is_seller))
        .route("/bookings", post(bookings::create))
}

/// Valid bearer token and a seller account.
pub fn seller() -> Router {
    Router::new()
        .route("/users/for-seller", get(users::own_account))
        .route("/categories-add-product", get(categories::names))
        .route("/phones", post(phones::create))
        .route("/phones/for-seller", get(phones::own_listings))
        .route("/phones/for-seller/:id", put(phones::advertise))
        .route("/phones/for-sold/:id", patch(phones::mark_sold))
        .route("/phones/for-unsold/:id", patch(phones::mark_unsold))
}

/// Valid bearer token and an admin account.
pub fn admin() -> Router {
    Router::new()
        .route("/users", get(users::list_all))
        .route("/users/sellers", get(users::list_sellers))
        .route("/users/buyers", get(users::list_buyers))
        .route("/users/admin/:id", delete(users::remove))
        .route("/categories", post(categories::create))
}
