//! Data models
//!
//! Rows as they are stored in the relational datastore.

/// Password marker for accounts created through Google sign-in.
///
/// Argon2 PHC strings always start with `$`, so no password ever
/// hashes to this value and such accounts cannot use the local strategy.
pub const OAUTH_PASSWORD_SENTINEL: &str = "google";

/// Registered user
///
/// Not `Serialize`; sessions carry only the email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique identifier, also the login username
    pub email: String,
    /// Argon2 PHC hash, or [`OAUTH_PASSWORD_SENTINEL`]
    pub password_hash: String,
    /// Free-text secret, absent until the user submits one.
    /// An empty stored secret reads back as `None`.
    pub secret: Option<String>,
}

impl User {
    /// Whether the account was created through Google sign-in
    pub fn is_oauth_only(&self) -> bool {
        self.password_hash == OAUTH_PASSWORD_SENTINEL
    }
}

/// Server-side half of a browser session
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Keyed digest of the cookie token
    pub token_hash: String,
    pub email: String,
    /// Unix seconds
    pub created_at: i64,
    /// Unix seconds
    pub expires_at: i64,
}
