//! Google OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with Google and
//! maps the resulting profile onto a local user.

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;

use super::session::{generate_token, removal_cookie, session_cookie};
use crate::AppState;
use crate::config::GoogleOAuthConfig;
use crate::data::{Database, OAUTH_PASSWORD_SENTINEL, User};
use crate::error::{AppError, AuthFailure};
use crate::metrics::{USERS_REGISTERED_TOTAL, record_auth_attempt};

/// CSRF state cookie name
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

const GOOGLE_SCOPES: &str = "profile email";

/// Create Google authentication router
///
/// Routes:
/// - GET /auth/google - Redirect to Google
/// - GET /auth/google/secrets - OAuth callback
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/secrets", get(google_callback))
}

// =============================================================================
// Provider client
// =============================================================================

/// Google token response
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

/// Google userinfo (v3) response
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    /// Stable Google account id
    pub sub: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Google OAuth client
pub struct GoogleOAuth {
    config: GoogleOAuthConfig,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(config: GoogleOAuthConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Consent page URL carrying `state` for CSRF protection
    pub fn authorization_url(&self, state: &str) -> Result<String, AppError> {
        let url = url::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("response_type", "code"),
                ("scope", GOOGLE_SCOPES),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Config(format!("auth.google.auth_url is invalid: {e}")))?;

        Ok(url.into())
    }

    /// Exchange an authorization code for the user's profile
    ///
    /// # Errors
    /// `AuthFailure::ProfileResolution` for transport errors, non-2xx
    /// responses, or a profile without an email
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleProfile, AppError> {
        let failure = |e: reqwest::Error| AuthFailure::ProfileResolution(e.to_string());

        let token: GoogleTokenResponse = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(failure)?
            .json()
            .await
            .map_err(failure)?;

        let profile: GoogleProfile = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(failure)?
            .json()
            .await
            .map_err(failure)?;

        if profile.email.as_deref().is_none_or(str::is_empty) {
            return Err(AuthFailure::ProfileResolution("profile has no email".to_string()).into());
        }

        Ok(profile)
    }
}

// =============================================================================
// Profile resolution
// =============================================================================

/// Return the user for a provider email, creating it on first sign-in
///
/// New users get the sentinel password and no secret. Existing users
/// are returned unchanged. Any store failure is reported as an
/// authentication failure.
pub async fn find_or_create_oauth_user(db: &Database, email: &str) -> Result<User, AppError> {
    let resolution = |e: AppError| AuthFailure::ProfileResolution(e.to_string());

    if let Some(user) = db.find_by_email(email).await.map_err(resolution)? {
        return Ok(user);
    }

    let user = db
        .insert_user(email, OAUTH_PASSWORD_SENTINEL)
        .await
        .map_err(resolution)?;

    USERS_REGISTERED_TOTAL.with_label_values(&["google"]).inc();
    tracing::info!(email = %user.email, "User created from Google profile");
    Ok(user)
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /auth/google
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to Google with client_id, redirect_uri, scope, state
async fn google_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if !state.google.is_configured() {
        tracing::warn!("Google sign-in requested but no client id is configured");
        return Ok((jar, Redirect::to("/login")));
    }

    let csrf_state = generate_token();
    let url = state.google.authorization_url(&csrf_state)?;

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies());

    Ok((jar.add(cookie), Redirect::to(&url)))
}

/// Query parameters from Google callback
#[derive(Debug, Deserialize)]
struct GoogleCallbackQuery {
    code: Option<String>,
    state: Option<String>,
    /// Set when the user declined consent
    error: Option<String>,
}

/// GET /auth/google/secrets
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token and fetch the profile
/// 3. Find or create the local user
/// 4. Create session and set cookie
/// 5. Redirect to /secrets, or to /login on any failure
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
    jar: CookieJar,
) -> Response {
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    let jar = jar.remove(removal_cookie(OAUTH_STATE_COOKIE));

    match complete_google_login(&state, query, expected_state).await {
        Ok(token) => {
            record_auth_attempt("google", "success");
            let cookie = session_cookie(token, state.config.should_use_secure_cookies());
            (jar.add(cookie), Redirect::to("/secrets")).into_response()
        }
        Err(error) => {
            record_auth_attempt("google", "failure");
            let error = match error {
                AppError::Authentication(failure) => AppError::Authentication(failure),
                other => AuthFailure::ProfileResolution(other.to_string()).into(),
            };
            (jar, error).into_response()
        }
    }
}

async fn complete_google_login(
    state: &AppState,
    query: GoogleCallbackQuery,
    expected_state: Option<String>,
) -> Result<String, AppError> {
    if let Some(error) = query.error {
        return Err(AuthFailure::ProfileResolution(format!("provider returned {error}")).into());
    }

    verify_csrf_state(query.state.as_deref(), expected_state.as_deref())?;

    let code = query
        .code
        .ok_or_else(|| AuthFailure::ProfileResolution("missing authorization code".to_string()))?;

    let profile = state.google.exchange_code(&code).await?;
    let email = profile.email.unwrap_or_default();
    let user = find_or_create_oauth_user(&state.db, &email).await?;

    state.sessions.establish(&user).await
}

// =============================================================================
// Helpers
// =============================================================================

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(received: Option<&str>, expected: Option<&str>) -> Result<(), AppError> {
    match (received, expected) {
        (Some(received), Some(expected)) if !expected.is_empty() && received == expected => Ok(()),
        _ => Err(AuthFailure::StateMismatch.into()),
    }
}
