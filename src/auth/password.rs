//! Password hashing and verification (Argon2id)
//!
//! Hashes are PHC strings with a random salt. Both operations are
//! CPU-bound and run on the blocking pool so handlers can await them.

use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::{AppError, AuthFailure};

/// Hash a password. Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string.
///
/// # Returns
/// `Ok(true)` on match, `Ok(false)` on mismatch
///
/// # Errors
/// `AuthFailure::Comparison` if the stored value is not an Argon2 hash
/// this build can check (unparseable, foreign algorithm, bad params)
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored).map_err(|_| AuthFailure::Comparison)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash cannot be verified");
            Err(AuthFailure::Comparison.into())
        }
    }
}

/// [`hash_password`] on the blocking pool
pub async fn hash_password_async(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

/// [`verify_password`] on the blocking pool
pub async fn verify_password_async(password: String, stored: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}
