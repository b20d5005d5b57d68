//! Username/password strategy

use super::password::verify_password_async;
use crate::data::{Database, User};
use crate::error::{AppError, AuthFailure};
use crate::metrics::record_auth_attempt;

/// Verify a username/password pair against the stored hash
///
/// # Returns
/// - `Ok(Some(user))` when the password matches
/// - `Ok(None)` when it does not
///
/// # Errors
/// - `AuthFailure::UserNotFound` if no user has that email
/// - `AuthFailure::Comparison` if the stored hash is unusable, which
///   includes accounts created through Google sign-in
/// - store errors from the lookup
pub async fn authenticate(
    db: &Database,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let Some(user) = db.find_by_email(username).await? else {
        record_auth_attempt("local", "unknown_user");
        return Err(AuthFailure::UserNotFound.into());
    };

    match verify_password_async(password.to_string(), user.password_hash.clone()).await {
        Ok(true) => {
            record_auth_attempt("local", "success");
            Ok(Some(user))
        }
        Ok(false) => {
            record_auth_attempt("local", "mismatch");
            tracing::info!(email = %user.email, "Password mismatch");
            Ok(None)
        }
        Err(error) => {
            record_auth_attempt("local", "error");
            tracing::error!(email = %user.email, %error, "Error comparing passwords");
            Err(error)
        }
    }
}
