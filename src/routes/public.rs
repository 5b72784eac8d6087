use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that need no token. The drinks listing only exposes the short view, so
/// recipes stay private to holders of `get:drinks-detail`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /drinks
        // Every drink with a color-only digest of its recipe.
        .route("/drinks", get(handlers::get_drinks))
}
