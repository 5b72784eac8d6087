use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use super::{AuthError, Claims, ValidatorState};
use crate::error::ApiError;

/// PermissionGate
///
/// Middleware state for one protected route: the validator and the permission the
/// route demands.
#[derive(Clone)]
pub struct PermissionGate {
    validator: ValidatorState,
    permission: &'static str,
}

/// requires_auth
///
/// Wraps `handler` so every request first passes [`authorize`] for `permission`. The
/// returned method router has the same shape as the one passed in and is registered
/// on the router like any other.
///
/// Gated handlers take `Extension<Claims>` as their first argument. Only the gate inserts
/// `Claims`, so a gated handler registered without this wrapper can never run: axum
/// rejects the request before the handler body is reached.
pub fn requires_auth<S>(
    validator: ValidatorState,
    permission: &'static str,
    handler: MethodRouter<S>,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let gate = PermissionGate {
        validator,
        permission,
    };
    handler.route_layer(middleware::from_fn_with_state(gate, authorize))
}

/// authorize
///
/// Token extraction, validation and the permission check, in that order.
/// On success the validated claims travel to the handler as a request extension.
pub async fn authorize(
    State(gate): State<PermissionGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .inspect_err(|err| deny(&gate, err))?
        .to_owned();

    let claims = gate
        .validator
        .validate(&token)
        .await
        .map_err(AuthError::from)
        .inspect_err(|err| deny(&gate, err))?;

    check_permission(&claims, gate.permission).inspect_err(|err| deny(&gate, err))?;

    tracing::debug!(sub = ?claims.sub, permission = gate.permission, "request authorized");
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn deny(gate: &PermissionGate, err: &AuthError) {
    tracing::warn!(
        permission = gate.permission,
        status = err.status().as_u16(),
        reason = %err,
        "request denied"
    );
}

/// bearer_token
///
/// Extracts the token from `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively and must be followed by exactly one space and a non-empty token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AuthError::unauthorized("missing authorization header"))?;

    let invalid = || AuthError::unauthorized("invalid header");
    let value = value.to_str().map_err(|_| invalid())?;

    match value.split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer")
                && !token.is_empty()
                && !token.contains(char::is_whitespace) =>
        {
            Ok(token)
        }
        _ => Err(invalid()),
    }
}

pub fn check_permission(claims: &Claims, permission: &str) -> Result<(), AuthError> {
    if claims.has_permission(permission) {
        Ok(())
    } else {
        Err(AuthError::forbidden("permission not found"))
    }
}
