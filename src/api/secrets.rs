//! Home page and the protected secret pages

use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Redirect},
    routing::get,
};
use serde::Deserialize;

use super::views;
use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::AppError;

/// Routes:
/// - GET /
/// - GET /secrets (session required)
/// - GET/POST /submit (session required)
pub fn secrets_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/secrets", get(show_secret))
        .route("/submit", get(submit_page).post(submit_secret))
}

async fn home(MaybeUser(user): MaybeUser) -> impl IntoResponse {
    views::home(user.is_some())
}

/// GET /secrets
///
/// The extractor re-reads the user row, so the secret is current.
async fn show_secret(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    views::secrets(user.secret.as_deref())
}

async fn submit_page(CurrentUser(_user): CurrentUser) -> impl IntoResponse {
    views::submit()
}

#[derive(Debug, Deserialize)]
pub struct SecretForm {
    pub secret: String,
}

/// POST /submit
///
/// Stores the secret verbatim.
async fn submit_secret(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<SecretForm>,
) -> Result<impl IntoResponse, AppError> {
    state.db.update_secret(&user.email, &form.secret).await?;
    tracing::info!(email = %user.email, "Secret updated");
    Ok(Redirect::to("/secrets"))
}
