pub mod songs;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::AppState;

/// API version prefix for the song catalog
pub const API_PREFIX: &str = "/api/v1";

async fn health() -> &'static str {
    "ok"
}

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .nest(API_PREFIX, songs::routes())
}
