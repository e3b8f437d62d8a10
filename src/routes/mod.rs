use axum::response::Redirect;

pub mod feedback;
pub mod user;

#[axum::debug_handler]
pub async fn home() -> Redirect {
    Redirect::to("/register")
}
