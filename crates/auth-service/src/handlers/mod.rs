pub mod auth_handler;
pub mod health;

pub use auth_handler::{
    handle_activate, handle_change_password, handle_login, handle_logout, handle_refresh,
    handle_register, handle_send_password_link, handle_verify,
};
pub use health::{health_check, metrics_handler};
