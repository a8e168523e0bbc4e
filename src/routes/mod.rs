mod auth;
mod health_check;

pub use auth::{
    forgot_password, get_current_user, login, logout, refresh, register, resend_verification,
    reset_password, verify_email,
};
pub use health_check::health_check;
