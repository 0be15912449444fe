mod common;

use serde_json::json;
use warp::http::StatusCode;

use common::*;

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let ctx = context();
    register(&ctx, "ann").await;

    let reply = post(
        &ctx,
        "/api/auth/token/login/",
        None,
        json!({ "email": "nobody@example.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = post(
        &ctx,
        "/api/auth/token/login/",
        None,
        json!({ "email": "ann@example.com", "password": "not-the-password" }),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["non_field_errors"][0],
        "Unable to log in with provided credentials."
    );

    let reply = post(&ctx, "/api/auth/token/login/", None, json!({ "email": "" })).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["email"][0], "This field is required.");
    assert_eq!(reply.body["password"][0], "This field is required.");
}

#[tokio::test]
async fn login_reuses_the_existing_token() {
    let ctx = context();
    register(&ctx, "ann").await;

    let first = login(&ctx, "ann").await;
    let second = login(&ctx, "ann").await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 40);

    let reply = post(
        &ctx,
        "/api/auth/token/login/",
        None,
        json!({ "email": "ANN@example.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(reply.body["auth_token"], first.as_str());
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let ctx = context();
    let (_, token) = sign_up(&ctx, "ann").await;

    let reply = post(&ctx, "/api/auth/token/logout/", Some(&token), json!({})).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = get(&ctx, "/api/users/me/", Some(&token)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        reply.body["detail"],
        "Authentication credentials were not provided."
    );

    let reply = post(&ctx, "/api/auth/token/logout/", Some(&token), json!({})).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let fresh = login(&ctx, "ann").await;
    assert_ne!(fresh, token);
}

#[tokio::test]
async fn bearer_scheme_is_accepted() {
    let ctx = context();
    let (id, token) = sign_up(&ctx, "ann").await;

    let response = warp::test::request()
        .method("GET")
        .path("/api/users/me/")
        .header("authorization", format!("Bearer {token}"))
        .reply(&foodgram_api::api::routes(ctx.clone()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["id"], id);
}

#[tokio::test]
async fn unknown_token_reads_public_pages_anonymously() {
    let ctx = context();
    register(&ctx, "ann").await;

    let reply = get(&ctx, "/api/users/", Some("ffffffffffffffffffffffffffffffffffffffff")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["count"], 1);

    let reply = get(&ctx, "/api/recipes/", Some("ffffffffffffffffffffffffffffffffffffffff")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["count"], 0);
}
