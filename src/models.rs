use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Domain Types ---

/// Ingredient
///
/// One component of a drink recipe. `parts` is the relative amount used when the
/// frontend draws the cup.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

/// Recipe
///
/// Clients may send a single ingredient object or an ordered list of them. Both shapes
/// are accepted and stored as given; the views always render a list.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[serde(untagged)]
#[ts(export)]
pub enum Recipe {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl Recipe {
    pub fn ingredients(&self) -> &[Ingredient] {
        match self {
            Recipe::Many(items) => items,
            Recipe::One(item) => std::slice::from_ref(item),
        }
    }

    /// An empty ingredient list counts as "not supplied" on update.
    pub fn is_empty(&self) -> bool {
        self.ingredients().is_empty()
    }

    /// Serialized form written to the `recipe` column.
    pub fn to_json_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Drink
///
/// A stored menu item. `id` is assigned by the record store and never changes.
/// `title` and `recipe` may be absent when the drink was created without them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drink {
    pub id: i32,
    pub title: Option<String>,
    pub recipe: Option<Recipe>,
}

impl Drink {
    /// Public representation: only the colors of the recipe are revealed.
    pub fn short(&self) -> DrinkShort {
        DrinkShort {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .ingredients()
                .iter()
                .map(|ingredient| ColorDigest {
                    color: ingredient.color.clone(),
                })
                .collect(),
        }
    }

    /// Detailed representation for holders of `get:drinks-detail`.
    pub fn long(&self) -> DrinkLong {
        DrinkLong {
            id: self.id,
            title: self.title.clone(),
            recipe: self.ingredients().to_vec(),
        }
    }

    fn ingredients(&self) -> &[Ingredient] {
        self.recipe.as_ref().map(Recipe::ingredients).unwrap_or(&[])
    }
}

/// NewDrink
///
/// Validated input for the record store's create operation.
#[derive(Debug, Clone, Default)]
pub struct NewDrink {
    pub title: Option<String>,
    pub recipe: Option<Recipe>,
}

/// DrinkChanges
///
/// Fields to overwrite on update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrinkChanges {
    pub title: Option<String>,
    pub recipe: Option<Recipe>,
}

impl DrinkChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.recipe.is_none()
    }
}

// --- Response Views (Output Schemas) ---

/// ColorDigest
///
/// The only ingredient detail exposed by the public listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct ColorDigest {
    pub color: String,
}

/// DrinkShort
///
/// Output schema for GET /drinks.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct DrinkShort {
    pub id: i32,
    pub title: Option<String>,
    pub recipe: Vec<ColorDigest>,
}

/// DrinkLong
///
/// Output schema for every endpoint that returns full recipes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct DrinkLong {
    pub id: i32,
    pub title: Option<String>,
    pub recipe: Vec<Ingredient>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DrinkSummaryList {
    pub success: bool,
    pub drinks: Vec<DrinkShort>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DrinkDetailList {
    pub success: bool,
    pub drinks: Vec<DrinkLong>,
}

/// DrinkDeleted
///
/// Output schema for DELETE /drinks/{id}; `delete` echoes the removed id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DrinkDeleted {
    pub success: bool,
    pub delete: i32,
}

// --- Request Payloads (Input Schemas) ---

/// CreateDrinkRequest
///
/// Input payload for POST /drinks. Both fields are optional on the wire; the handler
/// rejects the request only when both are missing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct CreateDrinkRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Recipe>,
}

impl CreateDrinkRequest {
    pub fn into_new_drink(self) -> Option<NewDrink> {
        if self.title.is_none() && self.recipe.is_none() {
            return None;
        }
        Some(NewDrink {
            title: self.title,
            recipe: self.recipe,
        })
    }
}

/// UpdateDrinkRequest
///
/// Partial update payload for PATCH /drinks/{id}. Fields arrive as raw JSON so that any
/// falsy value (`null`, `false`, `0`, `""`, `[]`, `{}`) can be read as "not supplied"
/// before the remaining values are checked against their real types.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct UpdateDrinkRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    #[schema(value_type = Option<String>)]
    pub title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<Recipe>")]
    #[schema(value_type = Option<Recipe>)]
    pub recipe: Option<Value>,
}

impl UpdateDrinkRequest {
    /// Fails only when a truthy value has the wrong shape, e.g. `"title": 5`.
    pub fn into_changes(self) -> Result<DrinkChanges, serde_json::Error> {
        Ok(DrinkChanges {
            title: supplied(self.title)?,
            recipe: supplied(self.recipe)?,
        })
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

fn supplied<T: DeserializeOwned>(value: Option<Value>) -> Result<Option<T>, serde_json::Error> {
    value
        .filter(|value| !is_falsy(value))
        .map(serde_json::from_value)
        .transpose()
}
