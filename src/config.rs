use std::env;
use std::time::Duration;

/// AppConfig
///
/// Holds the application's entire configuration state. It is loaded once at startup,
/// never mutated afterwards, and pulled into handlers and middleware through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the log format.
    pub env: Env,
    // Which record store backs the drinks table.
    pub store: StoreKind,
    // Postgres connection string. Only `None` when the in-memory store is selected.
    pub db_url: Option<String>,
    // Domain of the signing authority (e.g. `tenant.us.auth0.com`), without scheme.
    pub auth_domain: String,
    // Expected `aud` claim of every incoming token.
    pub api_audience: String,
    // How long a fetched key set is trusted before it is fetched again.
    pub jwks_cache_ttl: Duration,
    // Drop every drink and seed the default menu on start.
    pub reset_db_on_start: bool,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// The runtime context. Local runs get human-readable logs and development fallbacks,
/// production runs get JSON logs and refuse to start with missing settings.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// StoreKind
///
/// Selects the `Repository` implementation assembled in `main`.
#[derive(Clone, PartialEq, Debug)]
pub enum StoreKind {
    Postgres,
    Memory,
}

const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 300;
const LOCAL_AUTH_DOMAIN: &str = "coffee-shop.local";
const LOCAL_API_AUDIENCE: &str = "drinks";

impl Default for AppConfig {
    /// Safe, non-panicking configuration used to scaffold state in tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            store: StoreKind::Memory,
            db_url: None,
            auth_domain: LOCAL_AUTH_DOMAIN.to_string(),
            api_audience: LOCAL_API_AUDIENCE.to_string(),
            jwks_cache_ttl: Duration::from_secs(DEFAULT_JWKS_CACHE_TTL_SECS),
            reset_db_on_start: false,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment and applies the **fail-fast** principle.
    ///
    /// # Panics
    /// Panics when a variable required by the selected environment or store is missing, or
    /// when a numeric/boolean variable cannot be parsed. The service never starts half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let store = match env::var("STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            _ => StoreKind::Postgres,
        };

        let db_url = match store {
            StoreKind::Postgres => Some(
                env::var("DATABASE_URL")
                    .expect("FATAL: DATABASE_URL must be set when STORE=postgres."),
            ),
            StoreKind::Memory => env::var("DATABASE_URL").ok(),
        };

        // The signing authority is mandatory in production. Local runs fall back to
        // placeholders so the public endpoints work without an identity provider.
        let (auth_domain, api_audience) = match env {
            Env::Production => (
                env::var("AUTH0_DOMAIN").expect("FATAL: AUTH0_DOMAIN must be set in production."),
                env::var("API_AUDIENCE").expect("FATAL: API_AUDIENCE must be set in production."),
            ),
            Env::Local => (
                env::var("AUTH0_DOMAIN").unwrap_or_else(|_| LOCAL_AUTH_DOMAIN.to_string()),
                env::var("API_AUDIENCE").unwrap_or_else(|_| LOCAL_API_AUDIENCE.to_string()),
            ),
        };

        let jwks_cache_ttl = env::var("JWKS_CACHE_TTL_SECS")
            .ok()
            .map(|raw| {
                raw.parse::<u64>()
                    .expect("FATAL: JWKS_CACHE_TTL_SECS must be a whole number of seconds.")
            })
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_JWKS_CACHE_TTL_SECS));

        let reset_db_on_start = env::var("DB_RESET_ON_START")
            .ok()
            .map(|raw| {
                raw.parse::<bool>()
                    .expect("FATAL: DB_RESET_ON_START must be `true` or `false`.")
            })
            .unwrap_or(false);

        Self {
            env,
            store,
            db_url,
            auth_domain: auth_domain.trim_end_matches('/').to_string(),
            api_audience,
            jwks_cache_ttl,
            reset_db_on_start,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }

    /// Expected `iss` claim. Auth0 issues tokens with a trailing slash.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.auth_domain)
    }

    /// Standard key-discovery endpoint of the signing authority.
    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.auth_domain)
    }
}
