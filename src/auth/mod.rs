//! Bearer-token authorization for the drinks API.
//!
//! A request to a protected route passes through three pieces, in order:
//! the [`gate`] pulls the bearer token out of the `Authorization` header, the
//! [`TokenValidator`] verifies it against the signing authority's key set (located
//! through a [`KeyStore`]), and the gate then checks that the token grants the
//! permission the route was registered with.

use axum::http::StatusCode;
use thiserror::Error;

pub mod gate;
pub mod jwks;
pub mod validator;

pub use gate::{PermissionGate, requires_auth};
pub use jwks::{KeyStore, KeyStoreState, RemoteKeyStore, StaticKeyStore};
pub use validator::{Claims, TokenError, TokenValidator, ValidatorState};

/// Permission names granted by the identity provider, one per protected route.
pub mod permissions {
    pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";
    pub const POST_DRINKS: &str = "post:drinks";
    pub const PATCH_DRINKS: &str = "patch:drinks";
    pub const DELETE_DRINKS: &str = "delete:drinks";
}

/// AuthError
///
/// A denied request. Unlike the other API errors it carries its own status (401 or 403)
/// and message, and both reach the client unchanged.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct AuthError {
    status: StatusCode,
    message: String,
}

impl AuthError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::unauthorized(err.to_string())
    }
}
