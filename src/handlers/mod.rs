pub mod landing_handler;
pub mod oauth;

pub use landing_handler::landing_handler;
pub use oauth::{callback_handler, login_handler, logout_handler};
