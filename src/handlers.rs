use crate::{
    auth::Claims,
    error::{ApiError, ErrorBody},
    models::{
        CreateDrinkRequest, DrinkDeleted, DrinkDetailList, DrinkSummaryList, UpdateDrinkRequest,
    },
    repository::RepositoryState,
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State, rejection::PathRejection},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

/// parse_body
///
/// Decodes a JSON request body. An empty body is read as `{}` so a PATCH without a
/// payload is a no-op update rather than a client error. Text that is not JSON is a
/// 400; well-formed JSON of the wrong shape is a 422.
fn parse_body<T>(body: &Bytes) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(rejected_body)
}

fn rejected_body(err: serde_json::Error) -> ApiError {
    tracing::debug!(error = %err, "rejected request body");
    match err.classify() {
        Category::Data => ApiError::unprocessable(err.to_string()),
        Category::Syntax | Category::Eof | Category::Io => ApiError::BadRequest,
    }
}

// --- Handlers ---

/// get_drinks
///
/// [Public Route] Lists every drink in its short form (recipe colors only).
#[utoipa::path(
    get,
    path = "/drinks",
    responses(
        (status = 200, description = "All drinks, short view", body = DrinkSummaryList),
        (status = 422, description = "Record store failure", body = ErrorBody)
    )
)]
pub async fn get_drinks(
    State(repo): State<RepositoryState>,
) -> Result<Json<DrinkSummaryList>, ApiError> {
    let drinks = repo.list_drinks().await?;
    Ok(Json(DrinkSummaryList {
        success: true,
        drinks: drinks.iter().map(|drink| drink.short()).collect(),
    }))
}

/// get_drinks_detail
///
/// [Protected Route: `get:drinks-detail`] Lists every drink with its full recipe.
#[utoipa::path(
    get,
    path = "/drinks-detail",
    security(("bearer_auth" = ["get:drinks-detail"])),
    responses(
        (status = 200, description = "All drinks, long view", body = DrinkDetailList),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Permission not granted", body = ErrorBody),
        (status = 422, description = "Record store failure", body = ErrorBody)
    )
)]
pub async fn get_drinks_detail(
    Extension(_claims): Extension<Claims>,
    State(repo): State<RepositoryState>,
) -> Result<Json<DrinkDetailList>, ApiError> {
    let drinks = repo.list_drinks().await?;
    Ok(Json(DrinkDetailList {
        success: true,
        drinks: drinks.iter().map(|drink| drink.long()).collect(),
    }))
}

/// create_drink
///
/// [Protected Route: `post:drinks`] Adds a drink. Rejected with 422 before touching the
/// store when neither `title` nor `recipe` is supplied; either one alone is accepted.
#[utoipa::path(
    post,
    path = "/drinks",
    request_body = CreateDrinkRequest,
    security(("bearer_auth" = ["post:drinks"])),
    responses(
        (status = 200, description = "Created drink, long view", body = DrinkDetailList),
        (status = 400, description = "Malformed JSON", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Permission not granted", body = ErrorBody),
        (status = 422, description = "Missing or mistyped fields, or record store failure", body = ErrorBody)
    )
)]
pub async fn create_drink(
    Extension(claims): Extension<Claims>,
    State(repo): State<RepositoryState>,
    body: Bytes,
) -> Result<Json<DrinkDetailList>, ApiError> {
    let request: CreateDrinkRequest = parse_body(&body)?;
    let new_drink = request.into_new_drink().ok_or_else(|| {
        tracing::warn!("create rejected: neither title nor recipe supplied");
        ApiError::unprocessable("neither title nor recipe supplied")
    })?;

    let drink = repo.create_drink(new_drink).await?;
    tracing::info!(drink_id = drink.id, sub = ?claims.sub, "drink created");

    Ok(Json(DrinkDetailList {
        success: true,
        drinks: vec![drink.long()],
    }))
}

/// update_drink
///
/// [Protected Route: `patch:drinks`] Partial update. Only truthy supplied fields
/// change; everything else keeps its stored value.
#[utoipa::path(
    patch,
    path = "/drinks/{id}",
    params(("id" = i32, Path, description = "Drink ID")),
    request_body = UpdateDrinkRequest,
    security(("bearer_auth" = ["patch:drinks"])),
    responses(
        (status = 200, description = "Updated drink, long view", body = DrinkDetailList),
        (status = 400, description = "Malformed JSON", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Permission not granted", body = ErrorBody),
        (status = 404, description = "No drink with this id", body = ErrorBody),
        (status = 422, description = "Field of the wrong type or record store failure", body = ErrorBody)
    )
)]
pub async fn update_drink(
    Extension(claims): Extension<Claims>,
    State(repo): State<RepositoryState>,
    id: Result<Path<i32>, PathRejection>,
    body: Bytes,
) -> Result<Json<DrinkDetailList>, ApiError> {
    let Path(id) = id?;
    let request: UpdateDrinkRequest = parse_body(&body)?;
    let changes = request.into_changes().map_err(rejected_body)?;

    // Nothing to write: answer with the stored drink as it is.
    let drink = if changes.is_empty() {
        repo.get_drink(id).await?
    } else {
        repo.update_drink(id, changes).await?
    }
    .ok_or(ApiError::NotFound)?;
    tracing::info!(drink_id = id, sub = ?claims.sub, "drink updated");

    Ok(Json(DrinkDetailList {
        success: true,
        drinks: vec![drink.long()],
    }))
}

/// delete_drink
///
/// [Protected Route: `delete:drinks`] Removes a drink. Deleting an id that does not
/// exist (including one already deleted) is a 404.
#[utoipa::path(
    delete,
    path = "/drinks/{id}",
    params(("id" = i32, Path, description = "Drink ID")),
    security(("bearer_auth" = ["delete:drinks"])),
    responses(
        (status = 200, description = "Deleted", body = DrinkDeleted),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Permission not granted", body = ErrorBody),
        (status = 404, description = "No drink with this id", body = ErrorBody),
        (status = 422, description = "Record store failure", body = ErrorBody)
    )
)]
pub async fn delete_drink(
    Extension(claims): Extension<Claims>,
    State(repo): State<RepositoryState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<DrinkDeleted>, ApiError> {
    let Path(id) = id?;

    if !repo.delete_drink(id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(drink_id = id, sub = ?claims.sub, "drink deleted");

    Ok(Json(DrinkDeleted {
        success: true,
        delete: id,
    }))
}

// --- Fallbacks ---

/// Unknown paths.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Known paths, unsupported methods.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
