use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::{
    context::Context,
    error::ApiError,
    schema::{Id, Recipe, RecipePart, Relation, Tag, User},
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
        }
    }
}

/// Registration response; carries no relation flags.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserCreatedView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserCreatedView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeSummary {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeSummary {
    pub fn new(recipe: &Recipe, ctx: &Context) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: ctx.media.url(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientView {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for RecipeIngredientView {
    fn from(part: RecipePart) -> Self {
        Self {
            id: part.ingredient_id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeView {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

async fn related(
    ctx: &Context,
    kind: Relation,
    viewer: Option<Id>,
    targets: &[Id],
) -> Result<HashSet<Id>, ApiError> {
    match viewer {
        Some(user_id) if !targets.is_empty() => {
            ctx.store.related_ids(kind, user_id, targets).await
        }
        _ => Ok(HashSet::new()),
    }
}

/// Renders recipes in the given order with a constant number of store reads.
pub async fn render_recipes(
    ctx: &Context,
    recipes: Vec<Recipe>,
    viewer: Option<Id>,
) -> Result<Vec<RecipeView>, ApiError> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut parts: HashMap<Id, Vec<RecipeIngredientView>> = HashMap::new();
    for part in ctx.store.list_recipe_parts(&ids).await? {
        parts.entry(part.recipe_id).or_default().push(part.into());
    }

    let mut tags: HashMap<Id, Vec<Tag>> = HashMap::new();
    for tag in ctx.store.list_recipe_tags(&ids).await? {
        tags.entry(tag.recipe_id).or_default().push(tag.into());
    }

    let authors: HashMap<Id, User> = ctx
        .store
        .get_users(&author_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let subscribed = related(ctx, Relation::Follow, viewer, &author_ids).await?;
    let favorited = related(ctx, Relation::Favorite, viewer, &ids).await?;
    let in_cart = related(ctx, Relation::ShoppingCart, viewer, &ids).await?;

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors.get(&recipe.author_id).ok_or_else(|| {
                ApiError::Internal(format!("Recipe {} has no author", recipe.id))
            })?;

            Ok(RecipeView {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author: UserView::new(author, subscribed.contains(&author.id)),
                ingredients: parts.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                image: ctx.media.url(&recipe.image),
                name: recipe.name,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

pub async fn render_recipe(
    ctx: &Context,
    recipe: Recipe,
    viewer: Option<Id>,
) -> Result<RecipeView, ApiError> {
    render_recipes(ctx, vec![recipe], viewer)
        .await?
        .pop()
        .ok_or(ApiError::NotFound)
}

pub async fn render_users(
    ctx: &Context,
    users: &[User],
    viewer: Option<Id>,
) -> Result<Vec<UserView>, ApiError> {
    let ids: Vec<Id> = users.iter().map(|user| user.id).collect();
    let subscribed = related(ctx, Relation::Follow, viewer, &ids).await?;

    Ok(users
        .iter()
        .map(|user| UserView::new(user, subscribed.contains(&user.id)))
        .collect())
}

/// Followed authors with their newest recipes, `recipes_limit` per author.
pub async fn render_subscriptions(
    ctx: &Context,
    authors: &[User],
    recipes_limit: Option<i64>,
) -> Result<Vec<SubscriptionView>, ApiError> {
    let author_ids: Vec<Id> = authors.iter().map(|author| author.id).collect();
    let rows = ctx
        .store
        .list_authors_recipes(&author_ids, recipes_limit)
        .await?;

    let mut by_author: HashMap<Id, (Vec<RecipeSummary>, i64)> = HashMap::new();
    for row in rows {
        let entry = by_author
            .entry(row.recipe.author_id)
            .or_insert_with(|| (Vec::new(), row.recipes_count));
        entry.0.push(RecipeSummary::new(&row.recipe, ctx));
    }

    Ok(authors
        .iter()
        .map(|author| {
            let (recipes, recipes_count) = by_author.remove(&author.id).unwrap_or_default();
            SubscriptionView {
                author: UserView::new(author, true),
                recipes,
                recipes_count,
            }
        })
        .collect())
}
