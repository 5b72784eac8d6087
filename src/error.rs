use axum::{
    Json,
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{auth::AuthError, repository::RepositoryError};

/// ErrorBody
///
/// The uniform envelope returned for every failed request, whatever produced it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// The HTTP status code, repeated in the body.
    pub error: u16,
    /// Short, client-safe description.
    pub message: String,
}

/// ApiError
///
/// Every failure a handler or middleware can surface. Handlers return
/// `Result<_, ApiError>` and the conversion to an HTTP response happens in one place.
///
/// Only `Auth` carries a dynamic message; every other variant renders the fixed
/// message of its status code so internal details never reach the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("bad request")]
    BadRequest,

    #[error("resource not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    /// The request could not be processed. `reason` is for the logs only.
    #[error("unprocessable: {reason}")]
    Unprocessable { reason: String },

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn unprocessable(reason: impl Into<String>) -> Self {
        Self::Unprocessable {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => err.status(),
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The client-facing message.
    pub fn message(&self) -> String {
        match self {
            ApiError::Auth(err) => err.message().to_string(),
            ApiError::Unprocessable { .. } => "unprocessable".to_string(),
            other => other.to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            error: self.status().as_u16(),
            message: self.message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Storage failures keep the external 422 contract but are logged by kind, so a
/// rejected input and a database outage are distinguishable in the logs.
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match &err {
            RepositoryError::Validation(reason) => {
                tracing::warn!(reason = %reason, "drink rejected by the record store");
            }
            RepositoryError::Storage(source) => {
                tracing::error!(error = ?source, "record store failure");
            }
            RepositoryError::CorruptRecord { id, .. } => {
                tracing::error!(drink_id = id, error = %err, "stored drink could not be decoded");
            }
        }
        ApiError::unprocessable(err.to_string())
    }
}

// Drink ids are integers; anything else in the path names no resource.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "rejected path parameter");
        ApiError::NotFound
    }
}
