use bytes::BufMut;
use futures_util::TryStreamExt;
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    multipart::{FormData, Part},
    Filter, Rejection, Reply,
};

use crate::{
    codec::ImageInput,
    constants::{MAX_UPLOAD_SIZE, SHOPPING_LIST_FILENAME},
    context::{with_context, Context},
    error::{ApiError, FieldErrors},
    form::Form,
    middleware::{with_possible_session, with_session},
    pagination::{PageContext, PageRequest},
    permissions::ActionType,
    schema::{
        Id, IngredientAmountPayload, NewRecipe, Recipe, RecipeChanges, RecipeFilter,
        RecipePayload, Relation,
    },
    session::SessionData,
    shopping_list::ShoppingList,
    validation::{validate_recipe, WriteMode, REQUIRED},
};

use super::{
    json_reply, no_content, parse_json,
    views::{render_recipe, render_recipes, RecipeSummary},
    with_form, Response,
};

const INVALID_INTEGER: &str = "A valid integer is required.";

// Request bodies

fn malformed_multipart(e: warp::Error) -> ApiError {
    ApiError::validation("non_field_errors", format!("Malformed multipart body: {e}"))
}

async fn read_part(part: Part) -> Result<Vec<u8>, ApiError> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, buf| async move {
            acc.put(buf);
            Ok(acc)
        })
        .await
        .map_err(malformed_multipart)
}

/// Maps `multipart/form-data` fields onto the JSON payload shape. `tags`
/// repeats, `ingredients` is a JSON array string and `image` a file part.
/// Each part is drained before the next one is requested.
pub async fn payload_from_multipart(mut form: FormData) -> Result<RecipePayload, ApiError> {
    let mut payload = RecipePayload::default();
    let mut errors = FieldErrors::new();

    while let Some(part) = form.try_next().await.map_err(malformed_multipart)? {
        let name = part.name().to_string();
        let is_file = part.filename().is_some();
        let bytes = read_part(part).await?;
        let text = || String::from_utf8_lossy(&bytes).trim().to_string();

        match name.as_str() {
            "name" => payload.name = Some(text()),
            "text" => payload.text = Some(text()),
            "cooking_time" => match text().parse::<i64>() {
                Ok(value) => payload.cooking_time = Some(value),
                Err(_) => errors.add("cooking_time", INVALID_INTEGER),
            },
            "tags" => match text().parse::<Id>() {
                Ok(id) => payload.tags.get_or_insert_with(Vec::new).push(id),
                Err(_) => errors.add("tags", INVALID_INTEGER),
            },
            "ingredients" => match parse_json::<Vec<IngredientAmountPayload>>(&bytes) {
                Ok(list) => payload.ingredients = Some(list),
                Err(_) => errors.add("ingredients", "Expected a JSON list of {id, amount}."),
            },
            "image" if is_file => payload.image = Some(ImageInput::Raw(bytes)),
            "image" => payload.image = Some(ImageInput::Encoded(text())),
            other => log::debug!("Ignoring multipart field {other}"),
        }
    }

    errors.into_result()?;
    Ok(payload)
}

fn is_multipart(content_type: Option<&str>) -> bool {
    content_type.map_or(false, |value| {
        value
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("multipart/form-data")
    })
}

/// Passes only when the body is (or is not) multipart, so a failing branch
/// never hands an already consumed body to the other one.
fn content_is_multipart(expected: bool) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::optional::<String>("content-type")
        .and_then(move |content_type: Option<String>| async move {
            if is_multipart(content_type.as_deref()) == expected {
                Ok(())
            } else {
                Err(warp::reject::not_found())
            }
        })
        .untuple_one()
}

/// Recipe writes accept either multipart form data or JSON.
fn with_recipe_payload() -> impl Filter<Extract = (RecipePayload,), Error = Rejection> + Clone {
    let multipart = content_is_multipart(true)
        .and(warp::multipart::form().max_length(MAX_UPLOAD_SIZE))
        .and_then(|form: FormData| async move {
            payload_from_multipart(form)
                .await
                .map_err(warp::reject::custom)
        });

    let json = content_is_multipart(false).and(super::with_json::<RecipePayload>());

    multipart.or(json).unify()
}

// Handlers

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::validation(field, REQUIRED))
}

/// Loads a recipe the session may modify: its own, or any for admins.
async fn get_recipe_mut(ctx: &Context, session: &SessionData, id: Id) -> Result<Recipe, ApiError> {
    let recipe = ctx.store.get_recipe(id).await?.ok_or(ApiError::NotFound)?;

    session.authenticate_owner(
        recipe.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    )?;

    Ok(recipe)
}

fn recipe_filter(form: &Form, session: &Option<SessionData>) -> Result<RecipeFilter, ApiError> {
    let author = match form.get_number::<Id>("author") {
        None => None,
        Some(Ok(author)) => Some(author),
        Some(Err(_)) => return Err(ApiError::validation("author", INVALID_INTEGER)),
    };

    // Personal filters only apply to authenticated callers
    let viewer = session.as_ref().map(SessionData::user_id);

    Ok(RecipeFilter {
        tags: form.get_all("tags"),
        author,
        favorited_by: viewer.filter(|_| form.get_bool("is_favorited")),
        in_cart_of: viewer.filter(|_| form.get_bool("is_in_shopping_cart")),
    })
}

pub async fn list_recipes(
    form: Form,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let page = PageRequest::from_form(&form, ctx.config.page_size)?;
    let filter = recipe_filter(&form, &session)?;
    let viewer = session.as_ref().map(SessionData::user_id);

    let (recipes, total) = ctx.store.list_recipes(&filter, page).await?;
    let views = render_recipes(&ctx, recipes, viewer).await?;
    let page = PageContext::from_rows(views, total, page, "/api/recipes/", &form)?;

    Ok(json_reply(&page, StatusCode::OK))
}

pub async fn retrieve_recipe(
    id: Id,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let recipe = ctx.store.get_recipe(id).await?.ok_or(ApiError::NotFound)?;
    let view = render_recipe(&ctx, recipe, session.map(|s| s.user_id())).await?;

    Ok(json_reply(&view, StatusCode::OK))
}

pub async fn create_recipe(
    session: SessionData,
    payload: RecipePayload,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;

    let recipe = validate_recipe(payload, WriteMode::Create, ctx.store.as_ref()).await?;
    let image = ctx.media.save(required(recipe.image, "image")?).await?;

    let new_recipe = NewRecipe {
        name: required(recipe.name, "name")?,
        text: required(recipe.text, "text")?,
        cooking_time: required(recipe.cooking_time, "cooking_time")?,
        image: image.to_owned(),
        tags: recipe.tags.unwrap_or_default(),
        ingredients: required(recipe.ingredients, "ingredients")?,
    };

    let created = match ctx.store.create_recipe(session.user_id(), new_recipe).await {
        Ok(created) => created,
        Err(e) => {
            ctx.media.remove(&image).await;
            return Err(e.into());
        }
    };

    log::info!("User {} created recipe {}", session.user_id(), created.id);
    let view = render_recipe(&ctx, created, Some(session.user_id())).await?;

    Ok(json_reply(&view, StatusCode::CREATED))
}

pub async fn update_recipe(
    id: Id,
    mode: WriteMode,
    session: SessionData,
    payload: RecipePayload,
    ctx: Context,
) -> Result<Response, Rejection> {
    let current = get_recipe_mut(&ctx, &session, id).await?;
    let recipe = validate_recipe(payload, mode, ctx.store.as_ref()).await?;

    let image = match recipe.image {
        Some(image) => Some(ctx.media.save(image).await?),
        None => None,
    };

    let changes = RecipeChanges {
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        image: image.clone(),
        tags: recipe.tags,
        ingredients: recipe.ingredients,
    };

    let updated = match ctx.store.update_recipe(id, changes).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(image) = &image {
                ctx.media.remove(image).await;
            }
            return Err(e.into());
        }
    };

    if image.is_some() {
        ctx.media.remove(&current.image).await;
    }

    let view = render_recipe(&ctx, updated, Some(session.user_id())).await?;
    Ok(json_reply(&view, StatusCode::OK))
}

pub async fn delete_recipe(
    id: Id,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    let recipe = get_recipe_mut(&ctx, &session, id).await?;

    if !ctx.store.delete_recipe(recipe.id).await? {
        return Err(ApiError::NotFound.into());
    }
    ctx.media.remove(&recipe.image).await;

    log::info!("User {} deleted recipe {}", session.user_id(), recipe.id);
    Ok(no_content())
}

fn relation_action(kind: Relation) -> ActionType {
    match kind {
        Relation::ShoppingCart => ActionType::ManageOwnShoppingCart,
        Relation::Follow => ActionType::ManageOwnSubscriptions,
        Relation::Favorite => ActionType::ManageOwnFavorites,
    }
}

pub async fn add_recipe_relation(
    id: Id,
    kind: Relation,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(relation_action(kind))?;
    let recipe = ctx.store.get_recipe(id).await?.ok_or(ApiError::NotFound)?;

    if !ctx.store.add_relation(kind, session.user_id(), recipe.id).await? {
        return Err(ApiError::Conflict(kind.already_present().to_string()).into());
    }

    Ok(json_reply(
        &RecipeSummary::new(&recipe, &ctx),
        StatusCode::CREATED,
    ))
}

pub async fn remove_recipe_relation(
    id: Id,
    kind: Relation,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(relation_action(kind))?;
    let recipe = ctx.store.get_recipe(id).await?.ok_or(ApiError::NotFound)?;

    if !ctx
        .store
        .remove_relation(kind, session.user_id(), recipe.id)
        .await?
    {
        return Err(ApiError::Conflict(kind.not_present().to_string()).into());
    }

    Ok(no_content())
}

pub async fn download_shopping_cart(
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let items = ctx.store.list_cart_ingredients(session.user_id()).await?;
    let list = ShoppingList::from(items);
    log::debug!("Exporting {} shopping list lines for user {}", list.len(), session.user_id());

    Ok(warp::reply::with_header(
        list.to_string(),
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    )
    .into_response())
}

// Routes

pub fn routes(ctx: Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_form())
        .and(with_possible_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(with_recipe_payload())
        .and(with_context(ctx.clone()))
        .and_then(create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(download_shopping_cart);

    let retrieve = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(retrieve_recipe);

    let replace = warp::path!("recipes" / Id)
        .and(warp::put())
        .map(|id: Id| (id, WriteMode::Replace))
        .untuple_one();
    let patch = warp::path!("recipes" / Id)
        .and(warp::patch())
        .map(|id: Id| (id, WriteMode::Patch))
        .untuple_one();
    let update = replace
        .or(patch)
        .unify()
        .and(with_session(ctx.clone()))
        .and(with_recipe_payload())
        .and(with_context(ctx.clone()))
        .and_then(update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(delete_recipe);

    let relation = |segment: &'static str, kind: Relation| {
        let add = warp::path("recipes")
            .and(warp::path::param::<Id>())
            .and(warp::path(segment))
            .and(warp::path::end())
            .and(warp::get())
            .map(move |id: Id| (id, kind))
            .untuple_one()
            .and(with_session(ctx.clone()))
            .and(with_context(ctx.clone()))
            .and_then(add_recipe_relation);

        let remove = warp::path("recipes")
            .and(warp::path::param::<Id>())
            .and(warp::path(segment))
            .and(warp::path::end())
            .and(warp::delete())
            .map(move |id: Id| (id, kind))
            .untuple_one()
            .and(with_session(ctx.clone()))
            .and(with_context(ctx.clone()))
            .and_then(remove_recipe_relation);

        add.or(remove).unify()
    };

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(relation("favorite", Relation::Favorite))
        .unify()
        .or(relation("shopping_cart", Relation::ShoppingCart))
        .unify()
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_multipart_content_type() {
        assert!(is_multipart(Some("multipart/form-data; boundary=x")));
        assert!(is_multipart(Some("Multipart/Form-Data; boundary=x")));
        assert!(!is_multipart(Some("application/json")));
        assert!(!is_multipart(None));
    }

    #[tokio::test]
    async fn json_bodies_skip_the_multipart_branch() {
        let payload = warp::test::request()
            .method("POST")
            .header("content-type", "application/json")
            .body(r#"{"name": "Soup", "cooking_time": 5}"#)
            .filter(&with_recipe_payload())
            .await
            .unwrap();

        assert_eq!(payload.name.as_deref(), Some("Soup"));
        assert_eq!(payload.cooking_time, Some(5));
    }
}
