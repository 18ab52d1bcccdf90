//! Router assembly: one route in scope. Grounded in
//! `api::routes::create_router` (public/protected split via
//! `axum::middleware::from_fn_with_state`), narrowed to the single
//! protected `POST /orders` route this core serves.

use axum::{middleware as axum_middleware, routing::post, Router};
use std::sync::Arc;

use crate::api::auth::extract_claimed_address;
use crate::api::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(handlers::order::create_order))
        .layer(axum_middleware::from_fn_with_state(state, extract_claimed_address))
}
