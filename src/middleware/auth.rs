use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{AppState, error::AppError, session};

/// 当前请求的登录用户，由会话中间件写入请求扩展
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let username = session::current_user(&state, &jar)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(CurrentUser { username });
    Ok(next.run(request).await)
}

/// 属主检查，所有涉及属主数据的路由统一走这里；无属主的资源对任何人都拒绝
pub fn require_owner(user: &CurrentUser, owner: Option<&str>) -> Result<(), AppError> {
    if owner == Some(user.username.as_str()) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}
