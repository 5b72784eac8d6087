use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};

use super::TokenError;

/// Upper bound for a single key-set request. A slow authority must not hold requests open.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum gap between two refetches forced by an unknown `kid`.
const REFETCH_COOLDOWN: Duration = Duration::from_secs(30);

/// KeyStore Trait
///
/// Locates the public key a token was signed with, by its `kid` header.
/// `Ok(None)` means the key set was available but holds no key with that id.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn find_key(&self, kid: &str) -> Result<Option<Jwk>, TokenError>;
}

pub type KeyStoreState = Arc<dyn KeyStore>;

struct CachedKeySet {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

/// RemoteKeyStore
///
/// Fetches the signing authority's JWK set over HTTPS and caches it for `ttl`.
/// A `kid` missing from a fresh cache forces a refetch, so rotated keys are picked up
/// without waiting for the TTL. Forced refetches happen at most once every 30 seconds,
/// and concurrent requests share a single fetch.
pub struct RemoteKeyStore {
    client: reqwest::Client,
    url: String,
    ttl: Duration,
    cache: RwLock<Option<CachedKeySet>>,
    // Held for the duration of every fetch. Records the last forced refetch.
    refetch: Mutex<Option<Instant>>,
}

impl RemoteKeyStore {
    pub fn new(url: impl Into<String>, ttl: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self::with_client(client, url, ttl))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            ttl,
            cache: RwLock::new(None),
            refetch: Mutex::new(None),
        }
    }

    async fn cached(&self) -> Option<Arc<JwkSet>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.keys.clone())
    }

    async fn fetch(&self) -> Result<Arc<JwkSet>, TokenError> {
        tracing::debug!(url = %self.url, "fetching signing key set");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                tracing::error!(url = %self.url, error = %e, "signing key set request failed");
                TokenError::KeySetUnavailable
            })?;

        let keys = response.json::<JwkSet>().await.map_err(|e| {
            tracing::error!(url = %self.url, error = %e, "signing key set is not a valid JWK set");
            TokenError::KeySetUnavailable
        })?;

        let keys = Arc::new(keys);
        *self.cache.write().await = Some(CachedKeySet {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    /// Forced refetch for a `kid` the fresh cache does not hold.
    async fn refetch_for(&self, kid: &str) -> Result<Option<Jwk>, TokenError> {
        let mut last_forced = self.refetch.lock().await;

        // Re-read under the lock: a concurrent request may already have refetched.
        if let Some(keys) = self.cached().await {
            if let Some(key) = keys.find(kid) {
                return Ok(Some(key.clone()));
            }
            if last_forced.is_some_and(|at| at.elapsed() < REFETCH_COOLDOWN) {
                tracing::debug!(kid = %kid, "unknown kid, key set refetched recently");
                return Ok(None);
            }
            *last_forced = Some(Instant::now());
        }

        let keys = self.fetch().await?;
        Ok(keys.find(kid).cloned())
    }
}

#[async_trait]
impl KeyStore for RemoteKeyStore {
    async fn find_key(&self, kid: &str) -> Result<Option<Jwk>, TokenError> {
        if let Some(keys) = self.cached().await {
            if let Some(key) = keys.find(kid) {
                return Ok(Some(key.clone()));
            }
            return self.refetch_for(kid).await;
        }

        let _fetching = self.refetch.lock().await;
        // Another request may have refreshed the cache while this one waited.
        let keys = match self.cached().await {
            Some(keys) => keys,
            None => self.fetch().await?,
        };
        Ok(keys.find(kid).cloned())
    }
}

/// StaticKeyStore
///
/// A fixed key set, for local development and tests.
#[derive(Clone)]
pub struct StaticKeyStore {
    keys: JwkSet,
}

impl StaticKeyStore {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl KeyStore for StaticKeyStore {
    async fn find_key(&self, kid: &str) -> Result<Option<Jwk>, TokenError> {
        Ok(self.keys.find(kid).cloned())
    }
}
