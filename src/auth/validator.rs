use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};
use thiserror::Error;

use super::KeyStoreState;

/// Claims
///
/// The validated payload of an access token. `aud`, `iss` and `exp` are checked by the
/// validator before this struct is handed out, so only what handlers use is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject: the identity provider's id for the caller.
    #[serde(default)]
    pub sub: Option<String>,
    pub iss: String,
    pub exp: u64,
    /// Permissions granted to the caller. Tokens without the claim grant nothing.
    #[serde(default)]
    pub permissions: HashSet<String>,
}

impl Claims {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// TokenError
///
/// Why a token was refused. The display text is what the client sees.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Not three base64url segments, unparsable header, missing `kid`, or an algorithm
    /// outside the accepted list (which never contains `none`).
    #[error("unable to parse authentication token")]
    InvalidHeader,

    /// No key with the token's `kid`, or the signature does not verify against it.
    #[error("unable to verify token signature")]
    InvalidSignature,

    #[error("token expired")]
    TokenExpired,

    /// Wrong audience or issuer, or a required claim is missing.
    #[error("incorrect claims, please check the audience and issuer")]
    InvalidClaims,

    /// The key set could not be fetched or parsed.
    #[error("unable to fetch signing keys")]
    KeySetUnavailable,
}

/// TokenValidator
///
/// Verifies bearer tokens issued by one signing authority for one audience.
pub struct TokenValidator {
    keys: KeyStoreState,
    issuer: String,
    audience: String,
}

pub type ValidatorState = Arc<TokenValidator>;

/// Signing algorithms a token may declare. The identity provider signs with RS256.
const ACCEPTED_ALGORITHMS: &[Algorithm] = &[Algorithm::RS256];

impl TokenValidator {
    /// Creates a validator that accepts RS256 tokens only.
    pub fn new(keys: KeyStoreState, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// validate
    ///
    /// Runs the checks in a fixed order: structure and header, key lookup and signature,
    /// then the standard claims. The first failure wins.
    ///
    /// `jsonwebtoken::Algorithm` has no variant for `none`, so an unsigned token fails
    /// header decoding and is reported as `InvalidHeader` before any key is looked up.
    pub async fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::InvalidHeader);
        }

        let header = decode_header(token).map_err(|_| TokenError::InvalidHeader)?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            tracing::debug!(alg = ?header.alg, "token signed with an unaccepted algorithm");
            return Err(TokenError::InvalidHeader);
        }
        let kid = header.kid.ok_or(TokenError::InvalidHeader)?;

        let jwk = self
            .keys
            .find_key(&kid)
            .await?
            .ok_or_else(|| {
                tracing::debug!(kid = %kid, "no signing key matches the token");
                TokenError::InvalidSignature
            })?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|e| {
            tracing::error!(kid = %kid, error = %e, "signing key could not be loaded");
            TokenError::InvalidSignature
        })?;

        let mut validation = Validation::new(header.alg);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| classify(e.kind()))
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::TokenExpired,
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => TokenError::InvalidClaims,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidKeyFormat => TokenError::InvalidSignature,
        _ => TokenError::InvalidHeader,
    }
}
