//! Postgres-backed repository tests. They need a reachable database in `DATABASE_URL`
//! and share one table, so they are ignored by default and run serially:
//! `cargo test --test repository_integration_tests -- --ignored`.

use coffee_shop::{
    models::{DrinkChanges, Ingredient, NewDrink, Recipe},
    repository::{PostgresRepository, Repository, RepositoryError, default_menu},
};
use serial_test::serial;
use sqlx::PgPool;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    /// Connects, migrates, and empties the drinks table.
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        let repo = PostgresRepository::new(pool.clone());
        repo.migrate().await.expect("Failed to run database migrations.");
        repo.reset(vec![]).await.expect("Failed to empty the drinks table.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

fn espresso() -> NewDrink {
    NewDrink {
        title: Some("espresso".to_string()),
        recipe: Some(Recipe::Many(vec![Ingredient {
            name: "coffee".to_string(),
            color: "brown".to_string(),
            parts: 1,
        }])),
    }
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
#[serial]
async fn test_create_and_fetch_round_trip() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let created = repo.create_drink(espresso()).await.unwrap();
    let fetched = repo.get_drink(created.id).await.unwrap().unwrap();

    assert_eq!(fetched, created);
    assert_eq!(repo.list_drinks().await.unwrap(), vec![created]);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
#[serial]
async fn test_recipe_is_stored_as_json_text() {
    let ctx = DbTestContext::setup().await;
    let created = ctx.repository().create_drink(espresso()).await.unwrap();

    let raw: Option<String> = sqlx::query_scalar("SELECT recipe FROM drinks WHERE id = $1")
        .bind(created.id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw.unwrap()).unwrap();

    assert_eq!(
        stored,
        serde_json::json!([{"name": "coffee", "color": "brown", "parts": 1}])
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
#[serial]
async fn test_update_keeps_unsupplied_fields() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let created = repo.create_drink(espresso()).await.unwrap();

    let updated = repo
        .update_drink(
            created.id,
            DrinkChanges {
                title: Some("doppio".to_string()),
                recipe: None,
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.title.as_deref(), Some("doppio"));
    assert_eq!(updated.recipe, created.recipe);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
#[serial]
async fn test_missing_rows_are_none_or_false() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    assert!(repo.get_drink(999_999).await.unwrap().is_none());
    assert!(
        repo.update_drink(999_999, DrinkChanges::default())
            .await
            .unwrap()
            .is_none()
    );
    assert!(!repo.delete_drink(999_999).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
#[serial]
async fn test_duplicate_title_is_a_validation_error() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    repo.create_drink(espresso()).await.unwrap();

    let err = repo.create_drink(espresso()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Validation(_)), "got {err:?}");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
#[serial]
async fn test_corrupt_recipe_is_reported() {
    let ctx = DbTestContext::setup().await;
    sqlx::query("INSERT INTO drinks (title, recipe) VALUES ('broken', '{not json')")
        .execute(&ctx.pool)
        .await
        .unwrap();

    let err = ctx.repository().list_drinks().await.unwrap_err();
    assert!(matches!(err, RepositoryError::CorruptRecord { .. }), "got {err:?}");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
#[serial]
async fn test_reset_restarts_ids_and_seeds() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    repo.create_drink(espresso()).await.unwrap();

    repo.reset(default_menu()).await.unwrap();
    let drinks = repo.list_drinks().await.unwrap();

    assert_eq!(drinks.len(), 1);
    assert_eq!(drinks[0].id, 1);
    assert_eq!(drinks[0].title.as_deref(), Some("water"));
}
