use serde_json::json;
use warp::{filters::BoxedFilter, http::StatusCode, Filter, Rejection};

use crate::{
    context::{with_context, Context},
    cryptography::{generate_access_token, verify_password},
    error::{ApiError, FieldErrors},
    middleware::with_session,
    schema::LoginPayload,
    session::SessionData,
    validation::REQUIRED,
};

use super::{json_reply, no_content, with_json, Response};

pub const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

pub async fn login(payload: LoginPayload, ctx: Context) -> Result<Response, Rejection> {
    let mut errors = FieldErrors::new();
    if payload.email.as_deref().map_or(true, str::is_empty) {
        errors.add("email", REQUIRED);
    }
    if payload.password.as_deref().map_or(true, str::is_empty) {
        errors.add("password", REQUIRED);
    }
    errors.into_result()?;

    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let user = ctx
        .store
        .find_user_by_email(email.trim())
        .await?
        .ok_or(ApiError::NotFound)?;

    if !verify_password(&password, &user.password) {
        log::debug!("Failed login for user {}", user.id);
        return Err(ApiError::validation("non_field_errors", INVALID_CREDENTIALS).into());
    }

    let key = ctx
        .store
        .get_or_create_token(user.id, &generate_access_token())
        .await?;

    Ok(json_reply(&json!({ "auth_token": key }), StatusCode::CREATED))
}

pub async fn logout(session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    ctx.store.delete_token(session.user_id()).await?;

    log::debug!("User {} logged out", session.user_id());
    Ok(no_content())
}

pub fn routes(ctx: Context) -> BoxedFilter<(Response,)> {
    let issue = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(with_json::<LoginPayload>())
        .and(with_context(ctx.clone()))
        .and_then(login);

    let revoke = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx))
        .and_then(logout);

    issue.or(revoke).unify().boxed()
}
