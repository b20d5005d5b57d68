//! Authentication
//!
//! Handles:
//! - Local username/password strategy
//! - Google OAuth flow
//! - Session management
//! - Authentication extractors

pub mod local;
mod middleware;
mod oauth;
pub mod password;
pub mod session;

pub use middleware::{CurrentUser, MaybeUser, session_token};
pub use oauth::{
    GoogleOAuth, GoogleProfile, OAUTH_STATE_COOKIE, auth_router, find_or_create_oauth_user,
};
pub use session::{SESSION_COOKIE, SessionManager, removal_cookie, session_cookie};
