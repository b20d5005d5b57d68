//! Registration, login and logout
//!
//! Each handler is a straight line of fallible steps; the first failure
//! short-circuits through `AppError`.

use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::views;
use crate::AppState;
use crate::auth::{self, SESSION_COOKIE, removal_cookie, session_cookie};
use crate::error::AppError;
use crate::metrics::USERS_REGISTERED_TOTAL;

/// Routes:
/// - GET/POST /login
/// - GET/POST /register
/// - GET /logout
pub fn account_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", get(logout))
}

/// Login and registration form body
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

async fn login_page() -> impl IntoResponse {
    views::login()
}

async fn register_page() -> impl IntoResponse {
    views::register()
}

/// POST /login
///
/// Redirects to /secrets on success, to /login on mismatch or an
/// authentication error.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<impl IntoResponse, AppError> {
    let Some(user) = auth::local::authenticate(&state.db, &form.username, &form.password).await?
    else {
        return Ok((jar, Redirect::to("/login")));
    };

    let token = state.sessions.establish(&user).await?;
    tracing::info!(email = %user.email, "User logged in");

    let cookie = session_cookie(token, state.config.should_use_secure_cookies());
    Ok((jar.add(cookie), Redirect::to("/secrets")))
}

/// POST /register
///
/// # Steps
/// 1. Redirect to /login if the email is taken
/// 2. Hash the password
/// 3. Insert the user
/// 4. Establish a session and redirect to /secrets
///
/// The existence check and the insert are not atomic; a concurrent
/// duplicate fails at the unique constraint with a store error.
async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<impl IntoResponse, AppError> {
    if state.db.find_by_email(&form.username).await?.is_some() {
        tracing::info!(email = %form.username, "Registration for existing email");
        return Ok((jar, Redirect::to("/login")));
    }

    let hash = auth::password::hash_password_async(form.password).await?;
    let user = state.db.insert_user(&form.username, &hash).await?;
    USERS_REGISTERED_TOTAL.with_label_values(&["local"]).inc();

    let token = state.sessions.establish(&user).await?;
    tracing::info!(email = %user.email, "User registered");

    let cookie = session_cookie(token, state.config.should_use_secure_cookies());
    Ok((jar.add(cookie), Redirect::to("/secrets")))
}

/// GET /logout
///
/// Clears the session cookie whether or not a session exists, and
/// also when the server-side row could not be deleted.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|token| !token.is_empty());
    let jar = jar.remove(removal_cookie(SESSION_COOKIE));

    if let Some(token) = token {
        if let Err(e) = state.sessions.destroy(&token).await {
            return (jar, e).into_response();
        }
    }

    (jar, Redirect::to("/")).into_response()
}
