pub mod decision;
pub mod error;
pub mod forward_context;
pub mod login_attempts;
pub mod redirect_cookie;
