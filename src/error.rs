//! Error types for secrets-auth
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse`. Authentication failures become a
//! redirect to the login page; everything else is logged and answered
//! with a bare status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

/// Why an authentication attempt failed
///
/// A password mismatch is not listed here: it is a normal negative
/// outcome, not an error.
#[derive(Debug, Error)]
pub enum AuthFailure {
    /// No user with the submitted email
    #[error("user not found")]
    UserNotFound,

    /// Stored hash could not be parsed or compared
    #[error("comparison error")]
    Comparison,

    /// Provider profile could not be turned into a local user
    #[error("profile resolution failed: {0}")]
    ProfileResolution(String),

    /// OAuth `state` parameter did not match the cookie
    #[error("oauth state mismatch")]
    StateMismatch,
}

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Datastore unavailable or query failure (500)
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Credential or provider authentication failed (redirect to /login)
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthFailure),

    /// Session store I/O failure (500)
    #[error("Session error: {0}")]
    Session(String),

    /// No active session (redirect to /login)
    #[error("Authentication required")]
    Unauthorized,

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Label used for the `errors_total` metric
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Store(_) => "store",
            AppError::Authentication(_) => "authentication",
            AppError::Session(_) => "session",
            AppError::Unauthorized => "unauthorized",
            AppError::Config(_) => "config",
            AppError::HttpClient(_) => "http_client",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.kind()]).inc();

        let status = match &self {
            AppError::Unauthorized => {
                return Redirect::to("/login").into_response();
            }
            AppError::Authentication(failure) => {
                tracing::warn!(reason = %failure, "Authentication failed");
                return Redirect::to("/login").into_response();
            }
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_)
            | AppError::Session(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::error!(error = %self, "Request failed");

        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
