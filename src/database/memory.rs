use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    error::ApiError,
    pagination::PageRequest,
    schema::{
        AuthorRecipeRow, CartIngredient, Id, Ingredient, IngredientAmount, LinkedRecipeTag, NewIngredient,
        NewRecipe, NewTag, NewUser, Recipe, RecipeChanges, RecipeFilter, RecipePart, Relation,
        Tag, User, SELF_FOLLOW,
    },
    store::{IngredientStore, RecipeStore, RelationStore, TagStore, TokenStore, UserStore},
};

#[derive(Debug, Default)]
struct Tables {
    last_id: Id,
    users: BTreeMap<Id, User>,
    // token key -> user id
    tokens: HashMap<String, Id>,
    tags: BTreeMap<Id, Tag>,
    ingredients: BTreeMap<Id, Ingredient>,
    recipes: BTreeMap<Id, Recipe>,
    recipe_tags: Vec<(Id, Id)>,
    recipe_parts: Vec<(Id, IngredientAmount)>,
    relations: HashSet<(Relation, Id, Id)>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    fn recipe_name_taken(&self, name: &str, except: Option<Id>) -> bool {
        self.recipes
            .values()
            .any(|recipe| recipe.name == name && Some(recipe.id) != except)
    }

    fn replace_links(&mut self, recipe_id: Id, tags: Option<&[Id]>, parts: Option<&[IngredientAmount]>) {
        if let Some(tags) = tags {
            self.recipe_tags.retain(|(id, _)| *id != recipe_id);
            self.recipe_tags
                .extend(tags.iter().map(|tag_id| (recipe_id, *tag_id)));
        }
        if let Some(parts) = parts {
            self.recipe_parts.retain(|(id, _)| *id != recipe_id);
            self.recipe_parts
                .extend(parts.iter().map(|part| (recipe_id, *part)));
        }
    }

    fn remove_recipe(&mut self, id: Id) -> bool {
        if self.recipes.remove(&id).is_none() {
            return false;
        }

        self.recipe_tags.retain(|(recipe_id, _)| *recipe_id != id);
        self.recipe_parts.retain(|(recipe_id, _)| *recipe_id != id);
        self.relations.retain(|(kind, _, target)| {
            *kind == Relation::Follow || *target != id
        });
        true
    }

    fn matches(&self, recipe: &Recipe, filter: &RecipeFilter) -> bool {
        if let Some(author) = filter.author {
            if recipe.author_id != author {
                return false;
            }
        }

        if !filter.tags.is_empty() {
            let tagged = self.recipe_tags.iter().any(|(recipe_id, tag_id)| {
                *recipe_id == recipe.id
                    && self
                        .tags
                        .get(tag_id)
                        .map(|tag| filter.tags.contains(&tag.slug))
                        .unwrap_or(false)
            });
            if !tagged {
                return false;
            }
        }

        let related = |kind: Relation, user: Option<Id>| match user {
            Some(user) => self.relations.contains(&(kind, user, recipe.id)),
            None => true,
        };

        related(Relation::Favorite, filter.favorited_by)
            && related(Relation::ShoppingCart, filter.in_cart_of)
    }
}

fn newest_first(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
}

fn paginate<T>(rows: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(page.offset().max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect();

    (rows, total)
}

/// Process-local store with the same constraints and cascades as the
/// Postgres schema. Backs the test-suite and database-less runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, ApiError> {
        let mut tables = self.tables.lock().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(ApiError::validation(
                "email",
                "A user with that email already exists.",
            ));
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(ApiError::validation(
                "username",
                "A user with that username already exists.",
            ));
        }

        let created = User {
            id: tables.next_id(),
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            password: user.password,
            role: user.role,
        };
        tables.users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, ApiError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn get_users(&self, ids: &[Id]) -> Result<Vec<User>, ApiError> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), ApiError> {
        let tables = self.tables.lock().await;
        let users: Vec<User> = tables.users.values().rev().cloned().collect();

        Ok(paginate(users, page))
    }

    async fn set_password(&self, id: Id, password_hash: &str) -> Result<(), ApiError> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.get_mut(&id) {
            user.password = password_hash.to_string();
        }

        Ok(())
    }

    async fn delete_user(&self, id: Id) -> Result<bool, ApiError> {
        let mut tables = self.tables.lock().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        tables.tokens.retain(|_, user_id| *user_id != id);
        let owned: Vec<Id> = tables
            .recipes
            .values()
            .filter(|recipe| recipe.author_id == id)
            .map(|recipe| recipe.id)
            .collect();
        for recipe_id in owned {
            tables.remove_recipe(recipe_id);
        }
        tables.relations.retain(|(kind, user_id, target)| {
            *user_id != id && !(*kind == Relation::Follow && *target == id)
        });

        Ok(true)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get_or_create_token(&self, user_id: Id, candidate: &str) -> Result<String, ApiError> {
        let mut tables = self.tables.lock().await;

        if let Some((key, _)) = tables.tokens.iter().find(|(_, id)| **id == user_id) {
            return Ok(key.clone());
        }

        tables.tokens.insert(candidate.to_string(), user_id);
        Ok(candidate.to_string())
    }

    async fn find_token_user(&self, key: &str) -> Result<Option<User>, ApiError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tokens
            .get(key)
            .and_then(|user_id| tables.users.get(user_id))
            .cloned())
    }

    async fn delete_token(&self, user_id: Id) -> Result<bool, ApiError> {
        let mut tables = self.tables.lock().await;
        let before = tables.tokens.len();
        tables.tokens.retain(|_, id| *id != user_id);

        Ok(tables.tokens.len() < before)
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let tables = self.tables.lock().await;
        let mut tags: Vec<Tag> = tables.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(tags)
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, ApiError> {
        Ok(self.tables.lock().await.tags.get(&id).cloned())
    }

    async fn existing_tag_ids(&self, ids: &[Id]) -> Result<HashSet<Id>, ApiError> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| tables.tags.contains_key(id))
            .collect())
    }

    async fn insert_tag(&self, tag: NewTag) -> Result<bool, ApiError> {
        let mut tables = self.tables.lock().await;

        let taken = tables
            .tags
            .values()
            .any(|t| t.name == tag.name || t.color == tag.color || t.slug == tag.slug);
        if taken {
            return Ok(false);
        }

        let id = tables.next_id();
        tables.tags.insert(
            id,
            Tag {
                id,
                name: tag.name,
                color: tag.color,
                slug: tag.slug,
            },
        );

        Ok(true)
    }
}

#[async_trait]
impl IngredientStore for MemoryStore {
    async fn list_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>, ApiError> {
        let tables = self.tables.lock().await;
        let needle = name.map(str::to_lowercase);

        let mut rows: Vec<Ingredient> = tables
            .ingredients
            .values()
            .filter(|ingredient| match &needle {
                Some(needle) => ingredient.name.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(rows)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, ApiError> {
        Ok(self.tables.lock().await.ingredients.get(&id).cloned())
    }

    async fn existing_ingredient_ids(&self, ids: &[Id]) -> Result<HashSet<Id>, ApiError> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| tables.ingredients.contains_key(id))
            .collect())
    }

    async fn insert_ingredient(&self, ingredient: NewIngredient) -> Result<bool, ApiError> {
        let mut tables = self.tables.lock().await;

        let taken = tables.ingredients.values().any(|i| {
            i.name == ingredient.name && i.measurement_unit == ingredient.measurement_unit
        });
        if taken {
            return Ok(false);
        }

        let id = tables.next_id();
        tables.ingredients.insert(
            id,
            Ingredient {
                id,
                name: ingredient.name,
                measurement_unit: ingredient.measurement_unit,
                amount: ingredient.amount.max(1),
            },
        );

        Ok(true)
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<(Vec<Recipe>, i64), ApiError> {
        let tables = self.tables.lock().await;
        let mut recipes: Vec<Recipe> = tables
            .recipes
            .values()
            .filter(|recipe| tables.matches(recipe, filter))
            .cloned()
            .collect();
        newest_first(&mut recipes);

        Ok(paginate(recipes, page))
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, ApiError> {
        Ok(self.tables.lock().await.recipes.get(&id).cloned())
    }

    async fn create_recipe(&self, author_id: Id, recipe: NewRecipe) -> Result<Recipe, ApiError> {
        let mut tables = self.tables.lock().await;

        if tables.recipe_name_taken(&recipe.name, None) {
            return Err(ApiError::validation(
                "name",
                "A recipe with that name already exists.",
            ));
        }
        if !tables.users.contains_key(&author_id) {
            return Err(ApiError::Query(format!("User {author_id} does not exist")));
        }

        let created = Recipe {
            id: tables.next_id(),
            author_id,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            pub_date: Utc::now(),
        };
        tables.recipes.insert(created.id, created.clone());
        tables.replace_links(
            created.id,
            Some(&recipe.tags),
            Some(&recipe.ingredients),
        );

        Ok(created)
    }

    async fn update_recipe(&self, id: Id, changes: RecipeChanges) -> Result<Recipe, ApiError> {
        let mut tables = self.tables.lock().await;

        if let Some(name) = &changes.name {
            if tables.recipe_name_taken(name, Some(id)) {
                return Err(ApiError::validation(
                    "name",
                    "A recipe with that name already exists.",
                ));
            }
        }

        let recipe = tables.recipes.get_mut(&id).ok_or(ApiError::NotFound)?;
        if let Some(name) = changes.name {
            recipe.name = name;
        }
        if let Some(text) = changes.text {
            recipe.text = text;
        }
        if let Some(cooking_time) = changes.cooking_time {
            recipe.cooking_time = cooking_time;
        }
        if let Some(image) = changes.image {
            recipe.image = image;
        }
        let updated = recipe.clone();

        tables.replace_links(id, changes.tags.as_deref(), changes.ingredients.as_deref());

        Ok(updated)
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, ApiError> {
        Ok(self.tables.lock().await.remove_recipe(id))
    }

    async fn list_recipe_parts(&self, recipe_ids: &[Id]) -> Result<Vec<RecipePart>, ApiError> {
        let tables = self.tables.lock().await;

        let mut parts: Vec<RecipePart> = tables
            .recipe_parts
            .iter()
            .filter(|(recipe_id, _)| recipe_ids.contains(recipe_id))
            .filter_map(|(recipe_id, part)| {
                tables.ingredients.get(&part.id).map(|ingredient| RecipePart {
                    recipe_id: *recipe_id,
                    ingredient_id: ingredient.id,
                    name: ingredient.name.clone(),
                    measurement_unit: ingredient.measurement_unit.clone(),
                    amount: part.amount,
                })
            })
            .collect();
        parts.sort_by(|a, b| a.name.cmp(&b.name).then(a.ingredient_id.cmp(&b.ingredient_id)));

        Ok(parts)
    }

    async fn list_recipe_tags(&self, recipe_ids: &[Id]) -> Result<Vec<LinkedRecipeTag>, ApiError> {
        let tables = self.tables.lock().await;

        let mut tags: Vec<LinkedRecipeTag> = tables
            .recipe_tags
            .iter()
            .filter(|(recipe_id, _)| recipe_ids.contains(recipe_id))
            .filter_map(|(recipe_id, tag_id)| {
                tables.tags.get(tag_id).map(|tag| LinkedRecipeTag {
                    recipe_id: *recipe_id,
                    tag_id: tag.id,
                    name: tag.name.clone(),
                    color: tag.color.clone(),
                    slug: tag.slug.clone(),
                })
            })
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(tags)
    }

    async fn list_authors_recipes(
        &self,
        author_ids: &[Id],
        limit: Option<i64>,
    ) -> Result<Vec<AuthorRecipeRow>, ApiError> {
        let tables = self.tables.lock().await;
        let mut ids = author_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut rows = Vec::new();
        for author_id in ids {
            let mut recipes: Vec<Recipe> = tables
                .recipes
                .values()
                .filter(|recipe| recipe.author_id == author_id)
                .cloned()
                .collect();
            newest_first(&mut recipes);

            let recipes_count = recipes.len() as i64;
            if let Some(limit) = limit {
                recipes.truncate(limit.max(0) as usize);
            }
            rows.extend(recipes.into_iter().map(|recipe| AuthorRecipeRow {
                recipe,
                recipes_count,
            }));
        }

        Ok(rows)
    }
}

#[async_trait]
impl RelationStore for MemoryStore {
    async fn add_relation(
        &self,
        kind: Relation,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, ApiError> {
        if kind == Relation::Follow && user_id == target_id {
            return Err(ApiError::Conflict(String::from(SELF_FOLLOW)));
        }

        let mut tables = self.tables.lock().await;
        let target_exists = match kind {
            Relation::Follow => tables.users.contains_key(&target_id),
            Relation::Favorite | Relation::ShoppingCart => tables.recipes.contains_key(&target_id),
        };
        if !target_exists || !tables.users.contains_key(&user_id) {
            return Err(ApiError::NotFound);
        }

        Ok(tables.relations.insert((kind, user_id, target_id)))
    }

    async fn remove_relation(
        &self,
        kind: Relation,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, ApiError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.relations.remove(&(kind, user_id, target_id)))
    }

    async fn related_ids(
        &self,
        kind: Relation,
        user_id: Id,
        target_ids: &[Id],
    ) -> Result<HashSet<Id>, ApiError> {
        let tables = self.tables.lock().await;
        Ok(target_ids
            .iter()
            .copied()
            .filter(|target| tables.relations.contains(&(kind, user_id, *target)))
            .collect())
    }

    async fn list_subscriptions(
        &self,
        user_id: Id,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), ApiError> {
        let tables = self.tables.lock().await;
        let authors: Vec<User> = tables
            .users
            .values()
            .rev()
            .filter(|author| {
                tables
                    .relations
                    .contains(&(Relation::Follow, user_id, author.id))
            })
            .cloned()
            .collect();

        Ok(paginate(authors, page))
    }

    async fn list_cart_ingredients(&self, user_id: Id) -> Result<Vec<CartIngredient>, ApiError> {
        let tables = self.tables.lock().await;

        Ok(tables
            .recipe_parts
            .iter()
            .filter(|(recipe_id, _)| {
                tables
                    .relations
                    .contains(&(Relation::ShoppingCart, user_id, *recipe_id))
            })
            .filter_map(|(_, part)| {
                tables.ingredients.get(&part.id).map(|ingredient| CartIngredient {
                    name: ingredient.name.clone(),
                    measurement_unit: ingredient.measurement_unit.clone(),
                    amount: part.amount,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UserRole;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            first_name: String::from("First"),
            last_name: String::from("Last"),
            password: String::from("hash"),
            role: UserRole::User,
        }
    }

    fn new_recipe(name: &str, ingredients: Vec<IngredientAmount>) -> NewRecipe {
        NewRecipe {
            name: name.to_string(),
            text: String::from("Mix."),
            cooking_time: 5,
            image: String::from("recipes/images/a.png"),
            tags: vec![],
            ingredients,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_field_error() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice")).await.unwrap();

        let mut again = new_user("bob");
        again.email = String::from("alice@example.com");
        let err = store.create_user(again).await.unwrap_err();

        match err {
            ApiError::Validation(errors) => assert!(errors.contains("email")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn token_is_created_once() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("alice")).await.unwrap();

        let first = store.get_or_create_token(user.id, "aaa").await.unwrap();
        let second = store.get_or_create_token(user.id, "bbb").await.unwrap();
        assert_eq!(first, "aaa");
        assert_eq!(second, "aaa");

        assert!(store.delete_token(user.id).await.unwrap());
        assert!(store.find_token_user("aaa").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn relation_toggle_is_insert_if_absent() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("alice")).await.unwrap();
        let recipe = store
            .create_recipe(user.id, new_recipe("Soup", vec![]))
            .await
            .unwrap();

        assert!(store
            .add_relation(Relation::Favorite, user.id, recipe.id)
            .await
            .unwrap());
        assert!(!store
            .add_relation(Relation::Favorite, user.id, recipe.id)
            .await
            .unwrap());
        assert!(store
            .remove_relation(Relation::Favorite, user.id, recipe.id)
            .await
            .unwrap());
        assert!(!store
            .remove_relation(Relation::Favorite, user.id, recipe.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn self_follow_is_refused() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("alice")).await.unwrap();

        let err = store
            .add_relation(Relation::Follow, user.id, user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(message) if message == SELF_FOLLOW));
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let store = MemoryStore::new();
        let alice = store.create_user(new_user("alice")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();
        let recipe = store
            .create_recipe(alice.id, new_recipe("Soup", vec![]))
            .await
            .unwrap();
        store
            .add_relation(Relation::Favorite, bob.id, recipe.id)
            .await
            .unwrap();
        store
            .add_relation(Relation::Follow, bob.id, alice.id)
            .await
            .unwrap();

        assert!(store.delete_user(alice.id).await.unwrap());
        assert!(store.get_recipe(recipe.id).await.unwrap().is_none());
        assert!(store
            .related_ids(Relation::Favorite, bob.id, &[recipe.id])
            .await
            .unwrap()
            .is_empty());

        let (subscriptions, total) = store
            .list_subscriptions(bob.id, PageRequest::new(1, 6))
            .await
            .unwrap();
        assert!(subscriptions.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn author_recipes_come_in_one_batch() {
        let store = MemoryStore::new();
        let alice = store.create_user(new_user("alice")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();
        let carol = store.create_user(new_user("carol")).await.unwrap();
        for name in ["One", "Two", "Three"] {
            store
                .create_recipe(alice.id, new_recipe(name, vec![]))
                .await
                .unwrap();
        }
        store
            .create_recipe(bob.id, new_recipe("Solo", vec![]))
            .await
            .unwrap();

        let rows = store
            .list_authors_recipes(&[bob.id, alice.id, carol.id], Some(2))
            .await
            .unwrap();
        let names: Vec<(&str, i64)> = rows
            .iter()
            .map(|row| (row.recipe.name.as_str(), row.recipes_count))
            .collect();
        assert_eq!(names, vec![("Three", 3), ("Two", 3), ("Solo", 1)]);

        let rows = store.list_authors_recipes(&[alice.id], None).await.unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn ingredient_search_is_case_insensitive() {
        let store = MemoryStore::new();
        for (name, unit) in [("Sugar", "g"), ("brown sugar", "g"), ("salt", "g")] {
            store
                .insert_ingredient(NewIngredient {
                    name: name.to_string(),
                    measurement_unit: unit.to_string(),
                    amount: 1,
                })
                .await
                .unwrap();
        }

        let found = store.list_ingredients(Some("SUG")).await.unwrap();
        let names: Vec<&str> = found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Sugar", "brown sugar"]);
    }

    #[tokio::test]
    async fn update_replaces_links_only_when_given() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("alice")).await.unwrap();
        store
            .insert_ingredient(NewIngredient {
                name: String::from("salt"),
                measurement_unit: String::from("g"),
                amount: 1,
            })
            .await
            .unwrap();
        let salt = store.list_ingredients(None).await.unwrap()[0].id;

        let recipe = store
            .create_recipe(
                user.id,
                new_recipe("Soup", vec![IngredientAmount { id: salt, amount: 3 }]),
            )
            .await
            .unwrap();

        store
            .update_recipe(
                recipe.id,
                RecipeChanges {
                    cooking_time: Some(9),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let parts = store.list_recipe_parts(&[recipe.id]).await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].amount, 3);

        let updated = store
            .update_recipe(
                recipe.id,
                RecipeChanges {
                    ingredients: Some(vec![IngredientAmount { id: salt, amount: 7 }]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.cooking_time, 9);
        let parts = store.list_recipe_parts(&[recipe.id]).await.unwrap();
        assert_eq!(parts[0].amount, 7);
    }
}
