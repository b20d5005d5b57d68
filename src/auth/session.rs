//! Session management
//!
//! The browser holds a random opaque token in the `session` cookie.
//! The server stores only an HMAC of that token next to the user's
//! email. The password hash never leaves the users table.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::data::{Database, SessionRecord, User};
use crate::error::AppError;
use crate::metrics::SESSIONS_TOTAL;

/// Session cookie name
pub const SESSION_COOKIE: &str = "session";

const TOKEN_BYTES: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Generate a URL-safe random token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Cookie carrying a session token
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie that clears `name` in the browser
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// Issues, resolves and destroys sessions
pub struct SessionManager {
    db: Arc<Database>,
    secret: String,
    max_age: i64,
}

impl SessionManager {
    /// # Arguments
    /// * `secret` - HMAC key for token digests
    /// * `max_age` - session lifetime in seconds
    pub fn new(db: Arc<Database>, secret: String, max_age: i64) -> Self {
        Self {
            db,
            secret,
            max_age,
        }
    }

    fn digest(&self, token: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::Session(e.to_string()))?;
        mac.update(token.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Start a session for `user`
    ///
    /// # Returns
    /// The token to place in the session cookie
    pub async fn establish(&self, user: &User) -> Result<String, AppError> {
        let token = generate_token();
        let now = Utc::now().timestamp();
        let record = SessionRecord {
            token_hash: self.digest(&token)?,
            email: user.email.clone(),
            created_at: now,
            expires_at: now.saturating_add(self.max_age),
        };

        self.db
            .insert_session(&record)
            .await
            .map_err(|e| AppError::Session(e.to_string()))?;

        SESSIONS_TOTAL.with_label_values(&["established"]).inc();
        tracing::debug!(email = %user.email, "Session established");
        Ok(token)
    }

    /// Resolve a token to the current user record
    ///
    /// # Returns
    /// `None` if the token is unknown or expired, or the user is gone
    ///
    /// # Errors
    /// Store errors while reading the session or the user
    pub async fn resolve(&self, token: &str) -> Result<Option<User>, AppError> {
        if token.is_empty() {
            return Ok(None);
        }

        let token_hash = self.digest(token)?;
        let Some(email) = self
            .db
            .find_session_email(&token_hash, Utc::now().timestamp())
            .await?
        else {
            return Ok(None);
        };

        self.db.find_by_email(&email).await
    }

    /// End a session
    ///
    /// Succeeds when the token is already absent.
    ///
    /// # Errors
    /// `AppError::Session` on store I/O failure
    pub async fn destroy(&self, token: &str) -> Result<(), AppError> {
        let token_hash = self.digest(token)?;
        self.db
            .delete_session(&token_hash)
            .await
            .map_err(|e| AppError::Session(e.to_string()))?;

        SESSIONS_TOTAL.with_label_values(&["destroyed"]).inc();
        Ok(())
    }

    /// Drop expired sessions
    ///
    /// # Returns
    /// Number of sessions removed
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let removed = self
            .db
            .delete_expired_sessions(Utc::now().timestamp())
            .await
            .map_err(|e| AppError::Session(e.to_string()))?;

        SESSIONS_TOTAL
            .with_label_values(&["expired"])
            .inc_by(removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_manager(max_age: i64) -> (SessionManager, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}?mode=rwc", temp_dir.path().join("test.db").display());
        let db = Arc::new(Database::connect(&url, 1).await.unwrap());
        let manager = SessionManager::new(db.clone(), "k".repeat(32), max_age);
        (manager, db, temp_dir)
    }

    #[test]
    fn tokens_are_random_and_url_safe() {
        let first = generate_token();
        let second = generate_token();
        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[tokio::test]
    async fn establish_then_resolve_refetches_user() {
        let (manager, db, _temp_dir) = create_manager(3600).await;
        let user = db.insert_user("audrey@example.com", "hash").await.unwrap();

        let token = manager.establish(&user).await.unwrap();
        db.update_secret("audrey@example.com", "fresh").await.unwrap();

        let resolved = manager.resolve(&token).await.unwrap().expect("session");
        assert_eq!(resolved.email, "audrey@example.com");
        assert_eq!(resolved.secret.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn unknown_and_empty_tokens_resolve_to_none() {
        let (manager, _db, _temp_dir) = create_manager(3600).await;
        assert!(manager.resolve("").await.unwrap().is_none());
        assert!(manager.resolve("not-a-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve_and_get_purged() {
        let (manager, db, _temp_dir) = create_manager(-1).await;
        let user = db.insert_user("bill@example.com", "hash").await.unwrap();

        let token = manager.establish(&user).await.unwrap();
        assert!(manager.resolve(&token).await.unwrap().is_none());
        assert_eq!(manager.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn huge_max_age_does_not_overflow() {
        let (manager, db, _temp_dir) = create_manager(i64::MAX).await;
        let user = db.insert_user("chase@example.com", "hash").await.unwrap();

        let token = manager.establish(&user).await.unwrap();
        let resolved = manager.resolve(&token).await.unwrap().expect("session");
        assert_eq!(resolved.email, "chase@example.com");
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let (manager, db, _temp_dir) = create_manager(3600).await;
        let user = db.insert_user("david@example.com", "hash").await.unwrap();

        let token = manager.establish(&user).await.unwrap();
        manager.destroy(&token).await.unwrap();
        assert!(manager.resolve(&token).await.unwrap().is_none());
        manager.destroy(&token).await.unwrap();
    }

    #[tokio::test]
    async fn destroy_reports_session_error_when_store_is_down() {
        let (manager, db, _temp_dir) = create_manager(3600).await;
        db.close().await;

        let result = manager.destroy("anything").await;
        assert!(matches!(result, Err(AppError::Session(_))));
    }
}
