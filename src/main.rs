use coffee_shop::{
    AppState,
    auth::{RemoteKeyStore, TokenValidator},
    config::{AppConfig, Env, StoreKind},
    create_router,
    repository::{self, InMemoryRepository, PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, connects the record store, builds the
/// token validator, and serves the router until Ctrl-C.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast). `.env` is read before the environment is inspected.
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging. RUST_LOG wins over the development default.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "coffee_shop=debug,tower_http=info".into());

    // Pretty output for local debugging, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Record store.
    let repo: RepositoryState = match config.store {
        StoreKind::Postgres => {
            let db_url = config
                .db_url
                .as_deref()
                .expect("FATAL: DATABASE_URL must be set when STORE=postgres.");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            let postgres = PostgresRepository::new(pool);
            postgres
                .migrate()
                .await
                .expect("FATAL: Failed to apply database migrations.");
            Arc::new(postgres)
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory record store; drinks are lost on restart.");
            Arc::new(InMemoryRepository::new())
        }
    };

    if config.reset_db_on_start {
        tracing::warn!("DB_RESET_ON_START is set: dropping all drinks and seeding the default menu.");
        repo.reset(repository::default_menu())
            .await
            .expect("FATAL: Failed to reset the drinks table.");
    }

    // 4. Token validation against the signing authority's key set.
    let key_store = RemoteKeyStore::new(config.jwks_url(), config.jwks_cache_ttl)
        .expect("FATAL: Failed to build the HTTP client for the key-set endpoint.");
    let validator = Arc::new(TokenValidator::new(
        Arc::new(key_store),
        config.issuer(),
        config.api_audience.clone(),
    ));
    tracing::info!(issuer = %config.issuer(), audience = %config.api_audience, "Token validation configured");

    // 5. Shared state and router.
    let app = create_router(AppState { repo, validator });

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", config.bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections.");
}
