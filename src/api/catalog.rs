use warp::{filters::BoxedFilter, http::StatusCode, Filter, Rejection};

use crate::{
    cache::cache::{cached, CacheKey},
    context::{with_context, Context},
    error::ApiError,
    form::Form,
    schema::Id,
};

use super::{json_reply, with_form, Response};

pub async fn list_tags(ctx: Context) -> Result<Response, Rejection> {
    let store = ctx.store.clone();
    let tags = cached(ctx.cache.clone(), CacheKey::tag_list(), move || async move {
        store.list_tags().await
    })
    .await?;

    Ok(json_reply(&tags, StatusCode::OK))
}

pub async fn retrieve_tag(id: Id, ctx: Context) -> Result<Response, Rejection> {
    let tag = ctx.store.get_tag(id).await?.ok_or(ApiError::NotFound)?;

    Ok(json_reply(&tag, StatusCode::OK))
}

pub async fn list_ingredients(form: Form, ctx: Context) -> Result<Response, Rejection> {
    let name = form
        .get_str("name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let store = ctx.store.clone();
    let key = CacheKey::ingredient_search(name.as_deref());
    let ingredients = cached(ctx.cache.clone(), key, move || async move {
        store.list_ingredients(name.as_deref()).await
    })
    .await?;

    Ok(json_reply(&ingredients, StatusCode::OK))
}

pub async fn retrieve_ingredient(id: Id, ctx: Context) -> Result<Response, Rejection> {
    let ingredient = ctx
        .store
        .get_ingredient(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(json_reply(&ingredient, StatusCode::OK))
}

pub fn routes(ctx: Context) -> BoxedFilter<(Response,)> {
    let tags = warp::path!("tags")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(list_tags);

    let tag = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(retrieve_tag);

    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(with_form())
        .and(with_context(ctx.clone()))
        .and_then(list_ingredients);

    let ingredient = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(retrieve_ingredient);

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}
