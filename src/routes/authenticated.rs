use crate::{
    AppState,
    auth::{ValidatorState, permissions, requires_auth},
    handlers,
};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

/// Authenticated Router Module
///
/// Every route here is wrapped by `requires_auth` with the one permission it needs.
/// Paths shared with the public router (`/drinks`) are merged per method, so the
/// public GET stays open while POST is gated.
pub fn authenticated_routes(validator: ValidatorState) -> Router<AppState> {
    Router::new()
        // GET /drinks-detail
        // Every drink with its full recipe.
        .route(
            "/drinks-detail",
            requires_auth(
                validator.clone(),
                permissions::GET_DRINKS_DETAIL,
                get(handlers::get_drinks_detail),
            ),
        )
        // POST /drinks
        .route(
            "/drinks",
            requires_auth(
                validator.clone(),
                permissions::POST_DRINKS,
                post(handlers::create_drink),
            ),
        )
        // PATCH /drinks/{id}
        // Partial update; omitted or empty fields keep their stored value.
        .route(
            "/drinks/{id}",
            requires_auth(
                validator.clone(),
                permissions::PATCH_DRINKS,
                patch(handlers::update_drink),
            ),
        )
        // DELETE /drinks/{id}
        .route(
            "/drinks/{id}",
            requires_auth(
                validator,
                permissions::DELETE_DRINKS,
                delete(handlers::delete_drink),
            ),
        )
}
