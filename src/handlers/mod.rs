pub mod admin;
pub mod bookings;
pub mod health;
pub mod listings;
pub mod points;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/users/:id/bookings", get(bookings::customer_bookings))
        .route("/eco_points/:user_id/balance", get(points::get_balance))
        .route(
            "/eco_points/:user_id/transactions",
            get(points::get_transactions),
        )
        .route(
            "/listings",
            get(listings::list_listings).post(listings::create_listing),
        )
        .route(
            "/listings/:id",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route("/listings/:id/availability", get(listings::get_availability))
        .route(
            "/business/:owner_id/listings",
            get(listings::owner_listings),
        )
        .route(
            "/api/admin/listings/:id/approve",
            post(admin::approve_listing),
        )
        .route("/api/admin/sweep", post(admin::run_sweep))
        .route("/api/admin/bookings", get(admin::get_bookings))
        .route(
            "/api/admin/points/:user_id/audit",
            get(admin::audit_points),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
