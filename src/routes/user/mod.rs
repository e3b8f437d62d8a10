mod handler;
mod model;

pub use handler::{delete_user, login, logout, profile, register, show_login, show_register};
pub use model::User;
