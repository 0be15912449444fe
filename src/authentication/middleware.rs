use warp::{reject::Rejection, Filter};

use crate::{
    context::{with_context, Context},
    error::ApiError,
    session::SessionData,
};

const TOKEN_SCHEMES: &[&str] = &["Token", "Bearer"];

/// Extracts the key from `Authorization: Token <key>` (or `Bearer <key>`).
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, key) = header.trim().split_once(' ')?;
    let key = key.trim();

    if !TOKEN_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) || key.is_empty() {
        return None;
    }

    Some(key)
}

async fn resolve_session(
    header: Option<String>,
    ctx: Context,
) -> Result<Option<SessionData>, ApiError> {
    let Some(key) = header.as_deref().and_then(parse_authorization) else {
        return Ok(None);
    };

    let session = ctx
        .store
        .find_token_user(key)
        .await?
        .map(SessionData::new);

    if session.is_none() {
        log::debug!("Rejected unknown access token");
    }

    Ok(session)
}

/// Requires a valid token; rejects with `Unauthorized` otherwise.
pub fn with_session(
    ctx: Context,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_context(ctx))
        .and_then(|header: Option<String>, ctx: Context| async move {
            match resolve_session(header, ctx).await {
                Ok(Some(session)) => Ok(session),
                Ok(None) => Err(warp::reject::custom(ApiError::Unauthorized)),
                Err(e) => Err(warp::reject::custom(e)),
            }
        })
}

/// Anonymous requests and unknown tokens both resolve to `None`.
pub fn with_possible_session(
    ctx: Context,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_context(ctx))
        .and_then(|header: Option<String>, ctx: Context| async move {
            resolve_session(header, ctx)
                .await
                .map_err(warp::reject::custom)
        })
}
