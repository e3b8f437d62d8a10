use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    routes,
};

// 公开路由
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(routes::home))
        .route(
            "/register",
            get(routes::user::show_register).post(routes::user::register),
        )
        .route(
            "/login",
            get(routes::user::show_login).post(routes::user::login),
        )
        .route("/logout", get(routes::user::logout))
}

// 属主路由，统一挂会话中间件
pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/{username}", get(routes::user::profile))
        .route("/users/{username}/delete", post(routes::user::delete_user))
        .route(
            "/users/{username}/feedback/add",
            get(routes::feedback::show_add_feedback).post(routes::feedback::add_feedback),
        )
        .route(
            "/feedback/{id}/update",
            get(routes::feedback::show_update_feedback).post(routes::feedback::update_feedback),
        )
        .route("/feedback/{id}/delete", post(routes::feedback::delete_feedback))
        .layer(from_fn_with_state(state, auth_middleware))
}

pub fn build_router(state: AppState, rate_limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(from_fn(log_errors))
        .layer(from_fn_with_state(rate_limiter, rate_limit))
        .with_state(state)
}
