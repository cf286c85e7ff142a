//! API routes.

pub mod health;
pub mod redirect;
pub mod urls;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{metrics, rate_limit};
use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/api/v1/urls", post(urls::create_url))
        .route("/api/v1/urls/batch", post(urls::create_url_batch))
        .route("/:code", get(redirect::redirect))
        .layer(from_fn_with_state(state.clone(), rate_limit::limit))
        .layer(from_fn_with_state(state.clone(), metrics::track))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
