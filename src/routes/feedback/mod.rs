mod handler;
mod model;

pub use handler::{
    add_feedback, delete_feedback, show_add_feedback, show_update_feedback, update_feedback,
};
pub use model::Feedback;
