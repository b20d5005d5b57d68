//! Authentication extractors
//!
//! Resolve the `session` cookie to the current user.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::CookieJar;

use super::session::SESSION_COOKIE;
use crate::AppState;
use crate::data::User;
use crate::error::AppError;

/// Session token from the request cookies, if any
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|token| !token.is_empty())
}

async fn resolve_parts(parts: &mut Parts, state: &AppState) -> Result<Option<User>, AppError> {
    if let Some(user) = parts.extensions.get::<User>().cloned() {
        return Ok(Some(user));
    }

    let Some(token) = session_token(&parts.headers) else {
        return Ok(None);
    };

    let user = state.sessions.resolve(&token).await?;
    if let Some(user) = &user {
        parts.extensions.insert(user.clone());
    }

    Ok(user)
}

/// Extractor for current authenticated user
///
/// Rejects with a redirect to `/login` when there is no live session.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        resolve_parts(parts, &state)
            .await?
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated. Store failures still reject.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(MaybeUser(resolve_parts(parts, &state).await?))
    }
}
