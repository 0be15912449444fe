use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::ApiError,
    pagination::PageRequest,
    schema::{
        AuthorRecipeRow, CartIngredient, Id, IngredientAmount, Ingredient, LinkedRecipeTag, NewIngredient,
        NewRecipe, NewTag, NewUser, Recipe, RecipeChanges, RecipeFilter, RecipePart, RecipeRow,
        Relation, Tag, User, UserRow, SELF_FOLLOW,
    },
    store::{IngredientStore, RecipeStore, RelationStore, TagStore, TokenStore, UserStore},
};

const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), ApiError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Query(format!("{e}")))?;

        Ok(())
    }
}

/// Returns the violated constraint's name for errors with the given SQLSTATE.
fn violated_constraint(error: &sqlx::Error, code: &str) -> Option<String> {
    match error {
        sqlx::Error::Database(e) if e.code().as_deref() == Some(code) => {
            e.constraint().map(str::to_string)
        }
        _ => None,
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_recipe_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    if !filter.tags.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        query.push_bind(filter.tags.clone());
        query.push("))");
    }

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ");
        query.push_bind(author);
    }

    if let Some(user_id) = filter.favorited_by {
        query.push(
            " AND EXISTS (SELECT 1 FROM favorite_recipes f WHERE f.recipe_id = r.id AND f.user_id = ",
        );
        query.push_bind(user_id);
        query.push(")");
    }

    if let Some(user_id) = filter.in_cart_of {
        query.push(
            " AND EXISTS (SELECT 1 FROM shopping_cart_recipes c WHERE c.recipe_id = r.id AND c.user_id = ",
        );
        query.push_bind(user_id);
        query.push(")");
    }
}

async fn replace_recipe_tags(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Id,
    tags: &[Id],
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;

    if !tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

        query_builder.push_values(tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });

        query_builder.build().execute(&mut **tx).await?;
    }

    Ok(())
}

async fn replace_recipe_parts(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Id,
    parts: &[IngredientAmount],
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;

    if !parts.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

        query_builder.push_values(parts.iter(), |mut b, part| {
            b.push_bind(recipe_id)
                .push_bind(part.id)
                .push_bind(part.amount);
        });

        query_builder.build().execute(&mut **tx).await?;
    }

    Ok(())
}

fn recipe_name_taken(error: sqlx::Error) -> ApiError {
    match violated_constraint(&error, UNIQUE_VIOLATION).as_deref() {
        Some("recipes_name_key") => {
            ApiError::validation("name", "A recipe with that name already exists.")
        }
        _ => ApiError::from(error),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, ApiError> {
        sqlx::query_as(
            "
            INSERT INTO users (email, username, first_name, last_name, password, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        ",
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e, UNIQUE_VIOLATION).as_deref() {
            Some("users_email_key") => {
                ApiError::validation("email", "A user with that email already exists.")
            }
            Some("users_username_key") => {
                ApiError::validation("username", "A user with that username already exists.")
            }
            _ => ApiError::from(e),
        })
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, ApiError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn get_users(&self, ids: &[Id]) -> Result<Vec<User>, ApiError> {
        let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_users(&self, page: PageRequest) -> Result<(Vec<User>, i64), ApiError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total_count = rows.first().map(|row| row.count).unwrap_or(0);
        Ok((rows.into_iter().map(|row| row.user).collect(), total_count))
    }

    async fn set_password(&self, id: Id, password_hash: &str) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_user(&self, id: Id) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn get_or_create_token(&self, user_id: Id, candidate: &str) -> Result<String, ApiError> {
        sqlx::query(
            "INSERT INTO auth_tokens (key, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(candidate)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let key: (String,) = sqlx::query_as("SELECT key FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(key.0)
    }

    async fn find_token_user(&self, key: &str) -> Result<Option<User>, ApiError> {
        let row: Option<User> = sqlx::query_as(
            "SELECT u.* FROM auth_tokens t INNER JOIN users u ON u.id = t.user_id WHERE t.key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete_token(&self, user_id: Id) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TagStore for PgStore {
    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(list)
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, ApiError> {
        let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    async fn existing_tag_ids(&self, ids: &[Id]) -> Result<HashSet<Id>, ApiError> {
        let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn insert_tag(&self, tag: NewTag) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(tag.name)
        .bind(tag.color)
        .bind(tag.slug)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IngredientStore for PgStore {
    async fn list_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>, ApiError> {
        let rows: Vec<Ingredient> = match name {
            Some(name) => {
                sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, id")
                    .bind(format!("%{}%", escape_like(name)))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, ApiError> {
        let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn existing_ingredient_ids(&self, ids: &[Id]) -> Result<HashSet<Id>, ApiError> {
        let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn insert_ingredient(&self, ingredient: NewIngredient) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "
            INSERT INTO ingredients (name, measurement_unit, amount)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
        ",
        )
        .bind(ingredient.name)
        .bind(ingredient.measurement_unit)
        .bind(ingredient.amount.max(1))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<(Vec<Recipe>, i64), ApiError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

        push_recipe_filter(&mut query, filter);

        query.push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ");
        query.push_bind(page.limit);
        query.push(" OFFSET ");
        query.push_bind(page.offset());

        let rows: Vec<RecipeRow> = query.build_query_as().fetch_all(&self.pool).await?;

        let total_count = rows.first().map(|row| row.count).unwrap_or(0);
        Ok((rows.into_iter().map(|row| row.recipe).collect(), total_count))
    }

    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, ApiError> {
        let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn create_recipe(&self, author_id: Id, recipe: NewRecipe) -> Result<Recipe, ApiError> {
        let mut tx = self.pool.begin().await?;

        let created: Recipe = sqlx::query_as(
            "
            INSERT INTO recipes (author_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(author_id)
        .bind(&recipe.name)
        .bind(&recipe.image)
        .bind(&recipe.text)
        .bind(recipe.cooking_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(recipe_name_taken)?;

        replace_recipe_tags(&mut tx, created.id, &recipe.tags).await?;
        replace_recipe_parts(&mut tx, created.id, &recipe.ingredients).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update_recipe(&self, id: Id, changes: RecipeChanges) -> Result<Recipe, ApiError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<Recipe> = sqlx::query_as(
            "
            UPDATE recipes SET
            name = COALESCE($1, name),
            text = COALESCE($2, text),
            cooking_time = COALESCE($3, cooking_time),
            image = COALESCE($4, image)
            WHERE id = $5
            RETURNING *
        ",
        )
        .bind(&changes.name)
        .bind(&changes.text)
        .bind(changes.cooking_time)
        .bind(&changes.image)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(recipe_name_taken)?;

        let updated = updated.ok_or(ApiError::NotFound)?;

        if let Some(tags) = &changes.tags {
            replace_recipe_tags(&mut tx, id, tags).await?;
        }
        if let Some(parts) = &changes.ingredients {
            replace_recipe_parts(&mut tx, id, parts).await?;
        }

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_recipe_parts(&self, recipe_ids: &[Id]) -> Result<Vec<RecipePart>, ApiError> {
        let rows: Vec<RecipePart> = sqlx::query_as("
            SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY i.name, i.id
        ")
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_recipe_tags(&self, recipe_ids: &[Id]) -> Result<Vec<LinkedRecipeTag>, ApiError> {
        let rows: Vec<LinkedRecipeTag> = sqlx::query_as("
            SELECT rt.recipe_id AS recipe_id, t.id AS tag_id, t.name AS name, t.color AS color, t.slug AS slug
            FROM recipe_tags rt
            INNER JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY t.name
        ")
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_authors_recipes(
        &self,
        author_ids: &[Id],
        limit: Option<i64>,
    ) -> Result<Vec<AuthorRecipeRow>, ApiError> {
        let rows: Vec<AuthorRecipeRow> = sqlx::query_as("
            SELECT * FROM (
                SELECT r.*,
                    COUNT(*) OVER (PARTITION BY r.author_id) AS recipes_count,
                    ROW_NUMBER() OVER (
                        PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC
                    ) AS author_rank
                FROM recipes r
                WHERE r.author_id = ANY($1)
            ) ranked
            WHERE $2::BIGINT IS NULL OR author_rank <= $2
            ORDER BY author_id, pub_date DESC, id DESC
        ")
        .bind(author_ids)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl RelationStore for PgStore {
    async fn add_relation(
        &self,
        kind: Relation,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, ApiError> {
        let (table, column) = kind.table();

        let result = sqlx::query(&format!(
            "INSERT INTO {table} (user_id, {column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(user_id)
        .bind(target_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e, CHECK_VIOLATION).as_deref() {
            Some("follows_not_self") => ApiError::Conflict(String::from(SELF_FOLLOW)),
            _ => ApiError::from(e),
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_relation(
        &self,
        kind: Relation,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, ApiError> {
        let (table, column) = kind.table();

        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE user_id = $1 AND {column} = $2"
        ))
        .bind(user_id)
        .bind(target_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn related_ids(
        &self,
        kind: Relation,
        user_id: Id,
        target_ids: &[Id],
    ) -> Result<HashSet<Id>, ApiError> {
        let (table, column) = kind.table();

        let rows: Vec<(Id,)> = sqlx::query_as(&format!(
            "SELECT {column} FROM {table} WHERE user_id = $1 AND {column} = ANY($2)"
        ))
        .bind(user_id)
        .bind(target_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn list_subscriptions(
        &self,
        user_id: Id,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), ApiError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "
            SELECT u.*, COUNT(*) OVER() AS count
            FROM follows f
            INNER JOIN users u ON u.id = f.author_id
            WHERE f.user_id = $1
            ORDER BY u.id DESC
            LIMIT $2 OFFSET $3
        ",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total_count = rows.first().map(|row| row.count).unwrap_or(0);
        Ok((rows.into_iter().map(|row| row.user).collect(), total_count))
    }

    async fn list_cart_ingredients(&self, user_id: Id) -> Result<Vec<CartIngredient>, ApiError> {
        let rows: Vec<CartIngredient> = sqlx::query_as(
            "
            SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
            FROM shopping_cart_recipes c
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = $1
        ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn filter_adds_only_requested_clauses() {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT 1 FROM recipes r WHERE TRUE");
        push_recipe_filter(
            &mut query,
            &RecipeFilter {
                tags: vec![String::from("breakfast")],
                author: Some(2),
                favorited_by: None,
                in_cart_of: Some(3),
            },
        );

        let sql = query.sql();
        assert!(sql.contains("t.slug = ANY($1)"));
        assert!(sql.contains("r.author_id = $2"));
        assert!(!sql.contains("favorite_recipes"));
        assert!(sql.contains("c.user_id = $3"));
    }
}
