use std::collections::HashSet;

use async_trait::async_trait;

use crate::{
    error::ApiError,
    pagination::PageRequest,
    schema::{
        AuthorRecipeRow, CartIngredient, Id, Ingredient, LinkedRecipeTag, NewIngredient,
        NewRecipe, NewTag, NewUser, Recipe, RecipeChanges, RecipeFilter, RecipePart, Relation,
        Tag, User,
    },
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with a field error on `email` / `username` when either is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, ApiError>;
    async fn get_user(&self, id: Id) -> Result<Option<User>, ApiError>;
    async fn get_users(&self, ids: &[Id]) -> Result<Vec<User>, ApiError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;
    /// Newest accounts first, with the total row count.
    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), ApiError>;
    async fn set_password(&self, id: Id, password_hash: &str) -> Result<(), ApiError>;
    /// Cascades to the user's recipes, relations and token.
    async fn delete_user(&self, id: Id) -> Result<bool, ApiError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stores `candidate` unless the user already owns a token; returns the stored key.
    async fn get_or_create_token(&self, user_id: Id, candidate: &str) -> Result<String, ApiError>;
    async fn find_token_user(&self, key: &str) -> Result<Option<User>, ApiError>;
    async fn delete_token(&self, user_id: Id) -> Result<bool, ApiError>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError>;
    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, ApiError>;
    async fn existing_tag_ids(&self, ids: &[Id]) -> Result<HashSet<Id>, ApiError>;
    /// `false` when a tag with the same name, color or slug exists.
    async fn insert_tag(&self, tag: NewTag) -> Result<bool, ApiError>;
}

#[async_trait]
pub trait IngredientStore: Send + Sync {
    /// Case-insensitive substring match on the name, ordered by name.
    async fn list_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>, ApiError>;
    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, ApiError>;
    async fn existing_ingredient_ids(&self, ids: &[Id]) -> Result<HashSet<Id>, ApiError>;
    /// `false` when the (name, measurement unit) pair exists.
    async fn insert_ingredient(&self, ingredient: NewIngredient) -> Result<bool, ApiError>;
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Newest recipes first, with the total row count.
    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<(Vec<Recipe>, i64), ApiError>;
    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, ApiError>;
    /// Fails with a field error on `name` when the name is taken.
    async fn create_recipe(&self, author_id: Id, recipe: NewRecipe) -> Result<Recipe, ApiError>;
    async fn update_recipe(&self, id: Id, changes: RecipeChanges) -> Result<Recipe, ApiError>;
    async fn delete_recipe(&self, id: Id) -> Result<bool, ApiError>;
    async fn list_recipe_parts(&self, recipe_ids: &[Id]) -> Result<Vec<RecipePart>, ApiError>;
    async fn list_recipe_tags(&self, recipe_ids: &[Id]) -> Result<Vec<LinkedRecipeTag>, ApiError>;
    /// Newest recipes of every given author, at most `limit` per author,
    /// grouped by author. Authors without recipes yield no rows.
    async fn list_authors_recipes(
        &self,
        author_ids: &[Id],
        limit: Option<i64>,
    ) -> Result<Vec<AuthorRecipeRow>, ApiError>;
}

#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Atomic insert-if-absent; `false` means the relation already existed.
    async fn add_relation(&self, kind: Relation, user_id: Id, target_id: Id)
        -> Result<bool, ApiError>;
    /// `false` means there was nothing to remove.
    async fn remove_relation(
        &self,
        kind: Relation,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, ApiError>;
    /// The subset of `target_ids` related to `user_id`.
    async fn related_ids(
        &self,
        kind: Relation,
        user_id: Id,
        target_ids: &[Id],
    ) -> Result<HashSet<Id>, ApiError>;
    async fn list_subscriptions(
        &self,
        user_id: Id,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), ApiError>;
    async fn list_cart_ingredients(&self, user_id: Id) -> Result<Vec<CartIngredient>, ApiError>;
}

pub trait Store: UserStore + TokenStore + TagStore + IngredientStore + RecipeStore + RelationStore {}

impl<T> Store for T where
    T: UserStore + TokenStore + TagStore + IngredientStore + RecipeStore + RelationStore
{
}
