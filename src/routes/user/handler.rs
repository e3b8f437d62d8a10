use axum::{
    extract::{Extension, Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    error::AppError,
    middleware::{CurrentUser, require_owner},
    routes::feedback::Feedback,
    session,
    utils::success_to_api_response,
};

use super::model::{LoginRequest, ProfileResponse, RegisterRequest, User};

fn profile_url(username: &str) -> String {
    format!("/users/{}", username)
}

#[axum::debug_handler]
pub async fn show_register(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    // 已登录用户直接回自己的主页
    if let Some(username) = session::current_user(&state, &jar).await? {
        return Ok(Redirect::to(&profile_url(&username)).into_response());
    }

    Ok((StatusCode::OK, success_to_api_response(serde_json::json!({}))).into_response())
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<RegisterRequest>,
) -> Result<Response, AppError> {
    if let Some(username) = session::current_user(&state, &jar).await? {
        return Ok(Redirect::to(&profile_url(&username)).into_response());
    }

    req.validate()?;

    let user = User::register(&state.pool, req).await?;
    tracing::info!("Registered user: {}", user.username);

    let jar = session::establish(&state, jar, &user.username).await?;
    Ok((jar, Redirect::to(&profile_url(&user.username))).into_response())
}

#[axum::debug_handler]
pub async fn show_login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if let Some(username) = session::current_user(&state, &jar).await? {
        return Ok(Redirect::to(&profile_url(&username)).into_response());
    }

    Ok((StatusCode::OK, success_to_api_response(serde_json::json!({}))).into_response())
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<LoginRequest>,
) -> Result<Response, AppError> {
    if let Some(username) = session::current_user(&state, &jar).await? {
        return Ok(Redirect::to(&profile_url(&username)).into_response());
    }

    let user = User::authenticate(&state.pool, &req.username, &req.password)
        .await?
        .ok_or(AppError::AuthFailed)?;
    tracing::info!("User logged in: {}", user.username);

    let jar = session::establish(&state, jar, &user.username).await?;
    Ok((jar, Redirect::to(&profile_url(&user.username))).into_response())
}

#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let jar = session::clear(&state, jar).await?;
    Ok((jar, Redirect::to("/")).into_response())
}

#[axum::debug_handler]
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    // 先查属主再查库，非属主看不出用户是否存在
    require_owner(&user, Some(&username))?;

    let account = User::find_by_username(&state.pool, &username)
        .await?
        .ok_or(AppError::NotFound("用户"))?;
    let feedbacks = Feedback::find_for_user(&state.pool, &username).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(ProfileResponse {
            user: account,
            feedbacks,
        }),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(username): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    require_owner(&user, Some(&username))?;

    User::delete(&state.pool, &username).await?;
    tracing::info!("Deleted user: {}", username);

    let jar = session::clear(&state, jar).await?;
    Ok((jar, Redirect::to("/")).into_response())
}
