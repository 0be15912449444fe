use std::convert::Infallible;

use serde::{de::DeserializeOwned, Serialize};
use warp::{
    http::StatusCode,
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, MissingHeader,
        PayloadTooLarge, UnsupportedMediaType,
    },
    Filter, Rejection, Reply,
};

use crate::{constants::MAX_UPLOAD_SIZE, context::Context, error::ApiError, form::Form};

pub mod auth;
pub mod catalog;
pub mod recipes;
pub mod users;
pub mod views;

pub type Response = warp::reply::Response;

pub fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// The raw query string decoded into a [`Form`]; an absent query is empty.
pub fn with_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
        .and_then(|raw: String| async move {
            Form::from_query(&raw).map_err(warp::reject::custom)
        })
}

pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::validation("non_field_errors", format!("JSON parse error - {e}")))
}

/// JSON request body decoded into `T`; parse failures are validation errors.
pub fn with_json<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_UPLOAD_SIZE)
        .and(warp::body::bytes())
        .and_then(|body: bytes::Bytes| async move {
            parse_json::<T>(&body).map_err(warp::reject::custom)
        })
}

/// The whole `/api` surface plus read-only media files.
pub fn routes(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let api = warp::path("api").and(
        recipes::routes(ctx.clone())
            .or(users::routes(ctx.clone()))
            .unify()
            .or(auth::routes(ctx.clone()))
            .unify()
            .or(catalog::routes(ctx.clone()))
            .unify(),
    );

    let media = warp::path("media")
        .and(warp::fs::dir(ctx.config.media_root.clone()))
        .map(|file: warp::fs::File| file.into_response());

    api.or(media)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("foodgram"))
}

fn detail(status: StatusCode, message: &str) -> Response {
    json_reply(&serde_json::json!({ "detail": message }), status)
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(e) = err.find::<ApiError>() {
        if e.status().is_server_error() {
            log::error!("{e}");
        } else {
            log::debug!("{e}");
        }
        return Ok(json_reply(&e.body(), e.status()));
    }

    if err.is_not_found() {
        return Ok(detail(StatusCode::NOT_FOUND, "Not found."));
    }

    let response = if err.find::<PayloadTooLarge>().is_some() {
        detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large.")
    } else if err.find::<LengthRequired>().is_some() {
        detail(StatusCode::LENGTH_REQUIRED, "Content-Length is required.")
    } else if err.find::<UnsupportedMediaType>().is_some() {
        detail(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type.")
    } else if let Some(e) = err.find::<InvalidHeader>() {
        detail(StatusCode::BAD_REQUEST, &e.to_string())
    } else if let Some(e) = err.find::<MissingHeader>() {
        detail(StatusCode::BAD_REQUEST, &e.to_string())
    } else if err.find::<InvalidQuery>().is_some() {
        detail(StatusCode::BAD_REQUEST, "Malformed query string.")
    } else if err.find::<MethodNotAllowed>().is_some() {
        detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else {
        log::error!("Unhandled rejection: {err:?}");
        detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
    };

    Ok(response)
}
