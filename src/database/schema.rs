use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::codec::ImageInput;

pub type Id = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub password: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRow {
    #[sqlx(flatten)]
    pub user: User,
    pub count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

fn default_amount() -> i32 {
    1
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    #[serde(skip_serializing, default = "default_amount")]
    pub amount: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    #[sqlx(flatten)]
    pub recipe: Recipe,
    pub count: i64,
}

/// A recipe together with how many recipes its author has in total.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct AuthorRecipeRow {
    #[sqlx(flatten)]
    pub recipe: Recipe,
    pub recipes_count: i64,
}

/// An ingredient as linked into a recipe, carrying the per-recipe amount.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct RecipePart {
    pub recipe_id: Id,
    pub ingredient_id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct LinkedRecipeTag {
    pub recipe_id: Id,
    pub tag_id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<LinkedRecipeTag> for Tag {
    fn from(value: LinkedRecipeTag) -> Self {
        Self {
            id: value.tag_id,
            name: value.name,
            color: value.color,
            slug: value.slug,
        }
    }
}

/// One ingredient line of a recipe sitting in somebody's shopping cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartIngredient {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

pub const SELF_FOLLOW: &str = "You cannot subscribe to yourself";

/// User-to-target relations that follow the add/remove toggle contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Favorite,
    ShoppingCart,
    Follow,
}

impl Relation {
    /// Table and target column backing the relation.
    pub fn table(&self) -> (&'static str, &'static str) {
        match self {
            Relation::Favorite => ("favorite_recipes", "recipe_id"),
            Relation::ShoppingCart => ("shopping_cart_recipes", "recipe_id"),
            Relation::Follow => ("follows", "author_id"),
        }
    }

    pub fn already_present(&self) -> &'static str {
        match self {
            Relation::Favorite => "Recipe is already in favorites",
            Relation::ShoppingCart => "Recipe is already in the shopping cart",
            Relation::Follow => "You are already subscribed to this author",
        }
    }

    pub fn not_present(&self) -> &'static str {
        match self {
            Relation::Favorite => "Recipe is not in favorites",
            Relation::ShoppingCart => "Recipe is not in the shopping cart",
            Relation::Follow => "You are not subscribed to this author",
        }
    }
}

// Write models

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
    #[serde(default = "default_amount")]
    pub amount: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Partial recipe update; `None` keeps the stored value. Link lists given
/// here replace the existing links wholesale.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub favorited_by: Option<Id>,
    pub in_cart_of: Option<Id>,
}

// Request payloads

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(value)) => Ok(Some(value)),
        Some(Raw::Text(value)) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("A valid integer is required.")),
    }
}

fn lenient_int_required<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_int(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("A valid integer is required."))
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IngredientAmountPayload {
    pub id: Id,
    #[serde(deserialize_with = "lenient_int_required")]
    pub amount: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub cooking_time: Option<i64>,
    pub image: Option<ImageInput>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmountPayload>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterPayload {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordPayload {
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}
