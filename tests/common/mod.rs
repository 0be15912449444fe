#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use foodgram_api::{
    api,
    config::EnvConfig,
    context::Context,
    memory::MemoryStore,
    schema::{Id, NewIngredient, NewTag},
    storage::MediaStorage,
    store::{IngredientStore, TagStore},
};
use serde_json::{json, Value};
use warp::http::{Response, StatusCode};

pub const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
pub const PASSWORD: &str = "Sup3r-secret";

pub fn image_uri() -> String {
    format!("data:image/png;base64,{PIXEL_PNG}")
}

pub fn media_root() -> PathBuf {
    std::env::temp_dir().join(format!("foodgram-test-{}", uuid::Uuid::new_v4()))
}

/// Fresh in-memory app with its own media directory.
pub fn context() -> Context {
    let root = media_root();
    let config = EnvConfig {
        media_root: root.to_string_lossy().to_string(),
        ..EnvConfig::default()
    };
    let media = MediaStorage::new(&root, &config.media_url);

    Context::new(Arc::new(MemoryStore::new()), media, None, config)
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
    pub raw: Response<bytes::Bytes>,
}

impl Reply {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.raw.body()).to_string()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.raw
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

pub async fn send(
    ctx: &Context,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut request = warp::test::request().method(method).path(path);
    if let Some(token) = token {
        request = request.header("authorization", format!("Token {token}"));
    }
    if let Some(body) = body {
        request = request.json(&body);
    }

    let raw = request.reply(&api::routes(ctx.clone())).await;
    let body = serde_json::from_slice(raw.body()).unwrap_or(Value::Null);

    Reply {
        status: raw.status(),
        body,
        raw,
    }
}

pub async fn get(ctx: &Context, path: &str, token: Option<&str>) -> Reply {
    send(ctx, "GET", path, token, None).await
}

pub async fn post(ctx: &Context, path: &str, token: Option<&str>, body: Value) -> Reply {
    send(ctx, "POST", path, token, Some(body)).await
}

pub async fn delete(ctx: &Context, path: &str, token: Option<&str>) -> Reply {
    send(ctx, "DELETE", path, token, None).await
}

pub async fn register(ctx: &Context, username: &str) -> Id {
    let reply = post(
        ctx,
        "/api/users/",
        None,
        json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "first_name": "Test",
            "last_name": "Cook",
            "password": PASSWORD,
        }),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

    reply.body["id"].as_i64().unwrap() as Id
}

pub async fn login(ctx: &Context, username: &str) -> String {
    let reply = post(
        ctx,
        "/api/auth/token/login/",
        None,
        json!({ "email": format!("{username}@example.com"), "password": PASSWORD }),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

    reply.body["auth_token"].as_str().unwrap().to_string()
}

/// Registers and logs in; returns the user id and token.
pub async fn sign_up(ctx: &Context, username: &str) -> (Id, String) {
    let id = register(ctx, username).await;
    let token = login(ctx, username).await;
    (id, token)
}

/// Inserts catalog rows and returns ingredient ids keyed by name order.
pub async fn seed_catalog(ctx: &Context) -> (Vec<Id>, Vec<Id>) {
    for (name, unit) in [("flour", "g"), ("milk", "ml"), ("salt", "g")] {
        ctx.store
            .insert_ingredient(NewIngredient {
                name: name.to_string(),
                measurement_unit: unit.to_string(),
                amount: 1,
            })
            .await
            .unwrap();
    }
    for (name, color, slug) in [
        ("Breakfast", "#E26C2D", "breakfast"),
        ("Dinner", "#49B64E", "dinner"),
    ] {
        ctx.store
            .insert_tag(NewTag {
                name: name.to_string(),
                color: color.to_string(),
                slug: slug.to_string(),
            })
            .await
            .unwrap();
    }

    let ingredients = ctx
        .store
        .list_ingredients(None)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    let tags = ctx
        .store
        .list_tags()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();

    (ingredients, tags)
}

pub fn recipe_body(name: &str, ingredients: &[(Id, i64)], tags: &[Id]) -> Value {
    let ingredients: Vec<Value> = ingredients
        .iter()
        .map(|(id, amount)| json!({ "id": id, "amount": amount }))
        .collect();

    json!({
        "name": name,
        "text": "Mix everything and cook.",
        "cooking_time": 15,
        "image": image_uri(),
        "tags": tags,
        "ingredients": ingredients,
    })
}

pub async fn create_recipe(
    ctx: &Context,
    token: &str,
    name: &str,
    ingredients: &[(Id, i64)],
    tags: &[Id],
) -> Id {
    let reply = post(
        ctx,
        "/api/recipes/",
        Some(token),
        recipe_body(name, ingredients, tags),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

    reply.body["id"].as_i64().unwrap() as Id
}
