#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use coffee_shop::{
    AppState, create_router,
    auth::{StaticKeyStore, TokenValidator},
    repository::{InMemoryRepository, RepositoryState},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode, jwk::JwkSet};
use serde_json::{Value, json};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

// --- Signing Fixtures ---

pub const TEST_ISSUER: &str = "https://coffee-shop.test/";
pub const TEST_AUDIENCE: &str = "drinks";
pub const SIGNING_KID: &str = "drinks-signing-key";
pub const SIGNING_KEY_PEM: &str = include_str!("../fixtures/drinks-signing-key.pem");
/// A valid RSA key that is not published in the fixture key set.
pub const FOREIGN_KEY_PEM: &str = include_str!("../fixtures/rotated-out-key.pem");
pub const JWKS_JSON: &str = include_str!("../fixtures/jwks.json");

pub fn jwk_set() -> JwkSet {
    serde_json::from_str(JWKS_JSON).expect("fixture JWKS must parse")
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Claims of a well-formed token valid for an hour.
pub fn claims(permissions: &[&str]) -> Value {
    json!({
        "iss": TEST_ISSUER,
        "aud": TEST_AUDIENCE,
        "sub": "auth0|barista",
        "iat": now(),
        "exp": now() + 3600,
        "permissions": permissions,
    })
}

pub fn sign(claims: &Value, kid: &str, pem: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// An RS256 token signed with the published fixture key.
pub fn token(permissions: &[&str]) -> String {
    sign(&claims(permissions), SIGNING_KID, SIGNING_KEY_PEM)
}

/// An unsigned token (`"alg":"none"`, empty signature) that claims every permission
/// for the fixture issuer and audience, valid until 2100.
pub const UNSIGNED_TOKEN: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIiwia2lkIjoiZHJpbmtzLXNpZ25pbmcta2V5In0.eyJpc3MiOiJodHRwczovL2NvZmZlZS1zaG9wLnRlc3QvIiwiYXVkIjoiZHJpbmtzIiwic3ViIjoiYXV0aDB8aW50cnVkZXIiLCJleHAiOjQxMDI0NDQ4MDAsInBlcm1pc3Npb25zIjpbImdldDpkcmlua3MtZGV0YWlsIiwicG9zdDpkcmlua3MiLCJwYXRjaDpkcmlua3MiLCJkZWxldGU6ZHJpbmtzIl19.";

// --- Application Scaffolding ---

pub fn validator() -> TokenValidator {
    TokenValidator::new(
        Arc::new(StaticKeyStore::new(jwk_set())),
        TEST_ISSUER,
        TEST_AUDIENCE,
    )
}

pub fn app_state(repo: RepositoryState) -> AppState {
    AppState {
        repo,
        validator: Arc::new(validator()),
    }
}

pub fn app() -> Router {
    app_with(Arc::new(InMemoryRepository::new()))
}

pub fn app_with(repo: RepositoryState) -> Router {
    create_router(app_state(repo))
}

// --- Request Helpers ---

pub fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends one request through the router and decodes the JSON response body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

pub fn assert_error(body: &Value, status: u16, message: &str) {
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!(status));
    assert_eq!(body["message"], json!(message));
}
