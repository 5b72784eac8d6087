use crate::models::{Drink, DrinkChanges, Ingredient, NewDrink, Recipe};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, error::ErrorKind};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex;

/// RepositoryError
///
/// Separates input the store refused from infrastructure failure. Both surface to the
/// client as 422, but they are logged differently.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The store rejected the data itself (e.g. a duplicate title).
    #[error("{0}")]
    Validation(String),

    /// The store could not be reached or failed while executing the statement.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    /// A stored recipe is not valid recipe JSON.
    #[error("drink {id} has an unreadable recipe: {source}")]
    CorruptRecord {
        id: i32,
        #[source]
        source: serde_json::Error,
    },
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract for the drinks table. Handlers only see this trait, so the
/// Postgres implementation and the in-memory one are interchangeable.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn list_drinks(&self) -> RepositoryResult<Vec<Drink>>;
    async fn get_drink(&self, id: i32) -> RepositoryResult<Option<Drink>>;
    async fn create_drink(&self, drink: NewDrink) -> RepositoryResult<Drink>;
    /// Applies `changes` and returns the updated drink, or `None` if `id` does not exist.
    async fn update_drink(&self, id: i32, changes: DrinkChanges) -> RepositoryResult<Option<Drink>>;
    /// Returns `false` when there was nothing to delete.
    async fn delete_drink(&self, id: i32) -> RepositoryResult<bool>;
    /// Removes every drink, restarts id generation, and inserts `seed` in order.
    async fn reset(&self, seed: Vec<NewDrink>) -> RepositoryResult<()>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// The menu a freshly reset store starts with.
pub fn default_menu() -> Vec<NewDrink> {
    vec![NewDrink {
        title: Some("water".to_string()),
        recipe: Some(Recipe::Many(vec![Ingredient {
            name: "water".to_string(),
            color: "blue".to_string(),
            parts: 1,
        }])),
    }]
}

fn recipe_text(recipe: Option<&Recipe>) -> RepositoryResult<Option<String>> {
    recipe
        .map(Recipe::to_json_text)
        .transpose()
        .map_err(|e| RepositoryError::Validation(format!("recipe is not serializable: {e}")))
}

/// DrinkRow
///
/// Raw database row. The recipe is still serialized text at this point.
#[derive(Debug, FromRow)]
struct DrinkRow {
    id: i32,
    title: Option<String>,
    recipe: Option<String>,
}

impl TryFrom<DrinkRow> for Drink {
    type Error = RepositoryError;

    fn try_from(row: DrinkRow) -> Result<Self, Self::Error> {
        let recipe = row
            .recipe
            .as_deref()
            .map(Recipe::from_json_text)
            .transpose()
            .map_err(|source| RepositoryError::CorruptRecord { id: row.id, source })?;

        Ok(Drink {
            id: row.id,
            title: row.title,
            recipe,
        })
    }
}

/// Turns constraint violations into validation failures; everything else stays a storage error.
fn classify(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.kind() {
            ErrorKind::UniqueViolation => {
                return RepositoryError::Validation(
                    "a drink with this title already exists".to_string(),
                );
            }
            ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                return RepositoryError::Validation(db_err.message().to_string());
            }
            _ => {}
        }
    }
    RepositoryError::Storage(err)
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_drinks(&self) -> RepositoryResult<Vec<Drink>> {
        sqlx::query_as::<_, DrinkRow>("SELECT id, title, recipe FROM drinks ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?
            .into_iter()
            .map(Drink::try_from)
            .collect()
    }

    async fn get_drink(&self, id: i32) -> RepositoryResult<Option<Drink>> {
        sqlx::query_as::<_, DrinkRow>("SELECT id, title, recipe FROM drinks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?
            .map(Drink::try_from)
            .transpose()
    }

    async fn create_drink(&self, drink: NewDrink) -> RepositoryResult<Drink> {
        let recipe = recipe_text(drink.recipe.as_ref())?;
        let row = sqlx::query_as::<_, DrinkRow>(
            "INSERT INTO drinks (title, recipe) VALUES ($1, $2) RETURNING id, title, recipe",
        )
        .bind(drink.title)
        .bind(recipe)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Drink::try_from(row)
    }

    /// COALESCE keeps the stored value for every field that is `None` in `changes`.
    async fn update_drink(&self, id: i32, changes: DrinkChanges) -> RepositoryResult<Option<Drink>> {
        let recipe = recipe_text(changes.recipe.as_ref())?;
        sqlx::query_as::<_, DrinkRow>(
            r#"
            UPDATE drinks
            SET title = COALESCE($2, title),
                recipe = COALESCE($3, recipe)
            WHERE id = $1
            RETURNING id, title, recipe
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(recipe)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .map(Drink::try_from)
        .transpose()
    }

    async fn delete_drink(&self, id: i32) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM drinks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset(&self, seed: Vec<NewDrink>) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("TRUNCATE drinks RESTART IDENTITY")
            .execute(&mut *tx)
            .await?;
        for drink in seed {
            let recipe = recipe_text(drink.recipe.as_ref())?;
            sqlx::query("INSERT INTO drinks (title, recipe) VALUES ($1, $2)")
                .bind(drink.title)
                .bind(recipe)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// InMemoryRepository
///
/// A process-local `Repository` with the same id and uniqueness rules as the Postgres
/// table. Used by the test suite and by `STORE=memory` runs.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
    /// When true, every operation fails as if the database were unreachable.
    should_fail: bool,
}

#[derive(Default)]
struct MemoryState {
    last_id: i32,
    drinks: BTreeMap<i32, Drink>,
}

impl MemoryState {
    fn title_taken(&self, title: Option<&str>, except: Option<i32>) -> bool {
        let Some(title) = title else { return false };
        self.drinks
            .values()
            .any(|d| Some(d.id) != except && d.title.as_deref() == Some(title))
    }

    fn insert(&mut self, drink: NewDrink) -> RepositoryResult<Drink> {
        if self.title_taken(drink.title.as_deref(), None) {
            return Err(RepositoryError::Validation(
                "a drink with this title already exists".to_string(),
            ));
        }
        self.last_id += 1;
        let drink = Drink {
            id: self.last_id,
            title: drink.title,
            recipe: drink.recipe,
        };
        self.drinks.insert(drink.id, drink.clone());
        Ok(drink)
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn check_available(&self) -> RepositoryResult<()> {
        if self.should_fail {
            return Err(RepositoryError::Storage(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_drinks(&self) -> RepositoryResult<Vec<Drink>> {
        self.check_available()?;
        Ok(self.state.lock().await.drinks.values().cloned().collect())
    }

    async fn get_drink(&self, id: i32) -> RepositoryResult<Option<Drink>> {
        self.check_available()?;
        Ok(self.state.lock().await.drinks.get(&id).cloned())
    }

    async fn create_drink(&self, drink: NewDrink) -> RepositoryResult<Drink> {
        self.check_available()?;
        self.state.lock().await.insert(drink)
    }

    async fn update_drink(&self, id: i32, changes: DrinkChanges) -> RepositoryResult<Option<Drink>> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if !state.drinks.contains_key(&id) {
            return Ok(None);
        }
        if state.title_taken(changes.title.as_deref(), Some(id)) {
            return Err(RepositoryError::Validation(
                "a drink with this title already exists".to_string(),
            ));
        }
        let Some(drink) = state.drinks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            drink.title = Some(title);
        }
        if let Some(recipe) = changes.recipe {
            drink.recipe = Some(recipe);
        }
        Ok(Some(drink.clone()))
    }

    async fn delete_drink(&self, id: i32) -> RepositoryResult<bool> {
        self.check_available()?;
        Ok(self.state.lock().await.drinks.remove(&id).is_some())
    }

    async fn reset(&self, seed: Vec<NewDrink>) -> RepositoryResult<()> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        *state = MemoryState::default();
        for drink in seed {
            state.insert(drink)?;
        }
        Ok(())
    }
}
