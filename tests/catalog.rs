mod common;

use serde_json::json;
use warp::http::StatusCode;

use common::*;

#[tokio::test]
async fn tags_are_listed_by_name_without_pagination() {
    let ctx = context();
    let (_, tags) = seed_catalog(&ctx).await;

    let reply = get(&ctx, "/api/tags/", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.body,
        json!([
            { "id": tags[0], "name": "Breakfast", "color": "#E26C2D", "slug": "breakfast" },
            { "id": tags[1], "name": "Dinner", "color": "#49B64E", "slug": "dinner" },
        ])
    );

    let reply = get(&ctx, &format!("/api/tags/{}/", tags[1]), None).await;
    assert_eq!(reply.body["slug"], "dinner");

    let reply = get(&ctx, "/api/tags/9999/", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ingredients_are_searched_by_name() {
    let ctx = context();
    let (ingredients, _) = seed_catalog(&ctx).await;

    let reply = get(&ctx, "/api/ingredients/", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_array().unwrap().len(), 3);
    assert_eq!(reply.body[0]["name"], "flour");

    let reply = get(&ctx, "/api/ingredients/?name=MIL", None).await;
    assert_eq!(
        reply.body,
        json!([{ "id": ingredients[1], "name": "milk", "measurement_unit": "ml" }])
    );

    let reply = get(&ctx, "/api/ingredients/?name=%20%20", None).await;
    assert_eq!(reply.body.as_array().unwrap().len(), 3);

    let reply = get(&ctx, "/api/ingredients/?name=pepper", None).await;
    assert_eq!(reply.body, json!([]));

    let reply = get(&ctx, &format!("/api/ingredients/{}/", ingredients[2]), None).await;
    assert_eq!(reply.body["measurement_unit"], "g");

    let reply = get(&ctx, "/api/ingredients/9999/", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
