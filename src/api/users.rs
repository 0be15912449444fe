use warp::{filters::BoxedFilter, http::StatusCode, Filter, Rejection};

use crate::{
    constants::DEFAULT_RECIPES_LIMIT,
    context::{with_context, Context},
    cryptography::{hash_password, verify_password},
    error::{ApiError, FieldErrors},
    form::Form,
    middleware::{with_possible_session, with_session},
    pagination::{PageContext, PageRequest},
    permissions::ActionType,
    schema::{
        Id, NewUser, PasswordPayload, RegisterPayload, Relation, User, UserRole, SELF_FOLLOW,
    },
    session::SessionData,
    validation::{check_password, validate_registration, REQUIRED},
};

use super::{
    json_reply, no_content,
    views::{render_subscriptions, render_users, UserCreatedView, UserView},
    with_form, with_json, Response,
};

/// `recipes_limit` caps the recipes embedded per author; anything but a
/// positive integer falls back to the default.
fn recipes_limit(form: &Form) -> Option<i64> {
    match form.get_number::<i64>("recipes_limit") {
        Some(Ok(limit)) if limit >= 1 => Some(limit),
        _ => Some(DEFAULT_RECIPES_LIMIT),
    }
}

pub async fn list_users(
    form: Form,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let page = PageRequest::from_form(&form, ctx.config.page_size)?;
    let (users, total) = ctx.store.list_users(page).await?;

    let views = render_users(&ctx, &users, session.map(|s| s.user_id())).await?;
    let page = PageContext::from_rows(views, total, page, "/api/users/", &form)?;

    Ok(json_reply(&page, StatusCode::OK))
}

/// Validates and stores a new account with the given role. Shared by
/// sign-up and the `create_admin` tool.
pub async fn create_account(
    ctx: &Context,
    payload: RegisterPayload,
    role: UserRole,
) -> Result<User, ApiError> {
    let registration = validate_registration(payload)?;

    let user = ctx
        .store
        .create_user(NewUser {
            email: registration.email,
            username: registration.username,
            first_name: registration.first_name,
            last_name: registration.last_name,
            password: hash_password(&registration.password)?,
            role,
        })
        .await?;

    log::info!("Registered {:?} {} ({})", user.role, user.id, user.username);
    Ok(user)
}

pub async fn register_user(payload: RegisterPayload, ctx: Context) -> Result<Response, Rejection> {
    let user = create_account(&ctx, payload, UserRole::User).await?;
    Ok(json_reply(&UserCreatedView::from(&user), StatusCode::CREATED))
}

pub async fn retrieve_user(
    id: Id,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let user = ctx.store.get_user(id).await?.ok_or(ApiError::NotFound)?;
    let view = render_users(&ctx, &[user], session.map(|s| s.user_id()))
        .await?
        .pop()
        .ok_or(ApiError::NotFound)?;

    Ok(json_reply(&view, StatusCode::OK))
}

pub async fn me(session: SessionData) -> Result<Response, Rejection> {
    Ok(json_reply(
        &UserView::new(&session.user, false),
        StatusCode::OK,
    ))
}

pub async fn set_password(
    session: SessionData,
    payload: PasswordPayload,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnAccount)?;
    let mut errors = FieldErrors::new();

    match &payload.current_password {
        None => errors.add("current_password", REQUIRED),
        Some(current) if !verify_password(current, &session.user.password) => {
            errors.add("current_password", "Invalid password.")
        }
        Some(_) => {}
    }

    match &payload.new_password {
        None => errors.add("new_password", REQUIRED),
        Some(new_password) => {
            for message in check_password(new_password, &session.user.username, &session.user.email)
            {
                errors.add("new_password", message);
            }
        }
    }

    errors.into_result()?;

    let new_password = payload.new_password.unwrap_or_default();
    ctx.store
        .set_password(session.user_id(), &hash_password(&new_password)?)
        .await?;

    log::info!("User {} changed their password", session.user_id());
    Ok(no_content())
}

pub async fn delete_user(id: Id, session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    let user = ctx.store.get_user(id).await?.ok_or(ApiError::NotFound)?;
    session.authenticate_owner(user.id, ActionType::ManageOwnAccount, ActionType::ManageUsers)?;

    let recipes = ctx.store.list_authors_recipes(&[user.id], None).await?;
    if !ctx.store.delete_user(user.id).await? {
        return Err(ApiError::NotFound.into());
    }

    for row in &recipes {
        ctx.media.remove(&row.recipe.image).await;
    }

    log::info!("User {} deleted account {}", session.user_id(), user.id);
    Ok(no_content())
}

pub async fn list_subscriptions(
    form: Form,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let page = PageRequest::from_form(&form, ctx.config.page_size)?;
    let (authors, total) = ctx
        .store
        .list_subscriptions(session.user_id(), page)
        .await?;

    let views = render_subscriptions(&ctx, &authors, recipes_limit(&form)).await?;
    let page = PageContext::from_rows(views, total, page, "/api/users/subscriptions/", &form)?;

    Ok(json_reply(&page, StatusCode::OK))
}

pub async fn subscribe(
    id: Id,
    form: Form,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let author = ctx.store.get_user(id).await?.ok_or(ApiError::NotFound)?;

    if author.id == session.user_id() {
        return Err(ApiError::Conflict(String::from(SELF_FOLLOW)).into());
    }

    if !ctx
        .store
        .add_relation(Relation::Follow, session.user_id(), author.id)
        .await?
    {
        return Err(ApiError::Conflict(Relation::Follow.already_present().to_string()).into());
    }

    let view = render_subscriptions(&ctx, &[author], recipes_limit(&form))
        .await?
        .pop()
        .ok_or(ApiError::NotFound)?;

    Ok(json_reply(&view, StatusCode::CREATED))
}

pub async fn unsubscribe(id: Id, session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let author = ctx.store.get_user(id).await?.ok_or(ApiError::NotFound)?;

    if !ctx
        .store
        .remove_relation(Relation::Follow, session.user_id(), author.id)
        .await?
    {
        return Err(ApiError::Conflict(Relation::Follow.not_present().to_string()).into());
    }

    Ok(no_content())
}

pub fn routes(ctx: Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("users")
        .and(warp::get())
        .and(with_form())
        .and(with_possible_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(list_users);

    let register = warp::path!("users")
        .and(warp::post())
        .and(with_json::<RegisterPayload>())
        .and(with_context(ctx.clone()))
        .and_then(register_user);

    let profile = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(ctx.clone()))
        .and_then(me);

    let password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(with_json::<PasswordPayload>())
        .and(with_context(ctx.clone()))
        .and_then(set_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_form())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(list_subscriptions);

    let retrieve = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(retrieve_user);

    let delete = warp::path!("users" / Id)
        .and(warp::delete())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(delete_user);

    let follow = warp::path!("users" / Id / "subscribe")
        .and(warp::get())
        .and(with_form())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(subscribe);

    let unfollow = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(unsubscribe);

    list.or(register)
        .unify()
        .or(profile)
        .unify()
        .or(password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(retrieve)
        .unify()
        .or(delete)
        .unify()
        .or(follow)
        .unify()
        .or(unfollow)
        .unify()
        .boxed()
}
