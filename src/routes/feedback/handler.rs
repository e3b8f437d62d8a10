use axum::{
    extract::{Extension, Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    error::AppError,
    middleware::{CurrentUser, require_owner},
    utils::success_to_api_response,
};

use super::model::{Feedback, FeedbackRequest};

#[axum::debug_handler]
pub async fn show_add_feedback(
    Extension(user): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    require_owner(&user, Some(&username))?;

    Ok((StatusCode::OK, success_to_api_response(serde_json::json!({}))).into_response())
}

#[axum::debug_handler]
pub async fn add_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(username): Path<String>,
    Form(req): Form<FeedbackRequest>,
) -> Result<Response, AppError> {
    // 只能以自己的名义留言，与更新、删除同一检查
    require_owner(&user, Some(&username))?;

    req.validate()?;

    let feedback = Feedback::create(&state.pool, &username, req).await?;
    tracing::info!("Created feedback {} for {}", feedback.id, username);

    Ok(Redirect::to(&format!("/users/{}", username)).into_response())
}

#[axum::debug_handler]
pub async fn show_update_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let feedback = Feedback::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("留言"))?;
    require_owner(&user, feedback.username.as_deref())?;

    Ok((StatusCode::OK, success_to_api_response(feedback)).into_response())
}

#[axum::debug_handler]
pub async fn update_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Form(req): Form<FeedbackRequest>,
) -> Result<Response, AppError> {
    let feedback = Feedback::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("留言"))?;
    require_owner(&user, feedback.username.as_deref())?;

    req.validate()?;

    Feedback::update(&state.pool, id, req).await?;
    tracing::info!("Updated feedback {}", id);

    Ok(Redirect::to(&format!("/users/{}", user.username)).into_response())
}

#[axum::debug_handler]
pub async fn delete_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let feedback = Feedback::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("留言"))?;
    require_owner(&user, feedback.username.as_deref())?;

    Feedback::delete(&state.pool, id).await?;
    tracing::info!("Deleted feedback {}", id);

    Ok(Redirect::to(&format!("/users/{}", user.username)).into_response())
}
