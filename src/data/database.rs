//! Relational datastore operations
//!
//! All database access goes through this module. The pool is an
//! `AnyPool`, so the same queries run against PostgreSQL in production
//! and SQLite for local runs and tests.

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use std::time::Instant;

use super::models::*;
use crate::error::AppError;

// SQLite NULLs do not decode through the `Any` driver, so the nullable
// secret is read as text and mapped back to `Option` in `UserRow`.
const USER_COLUMNS: &str = "email, password, COALESCE(secret, '') AS secret";

#[derive(sqlx::FromRow)]
struct UserRow {
    email: String,
    password: String,
    secret: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            email: row.email,
            password_hash: row.password,
            secret: Some(row.secret).filter(|secret| !secret.is_empty()),
        }
    }
}

/// Database connection pool wrapper.
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to the datastore and make sure the tables exist.
    ///
    /// # Arguments
    /// * `url` - `postgres://...` or `sqlite:...` connection URL
    /// * `max_connections` - pool size
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, AppError> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        Ok(db)
    }

    /// Create tables if they are missing.
    ///
    /// Plain idempotent DDL, portable across PostgreSQL and SQLite.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                secret TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token_hash TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                created_at BIGINT NOT NULL,
                expires_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::debug!("Database schema ensured");
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Look up a user by email
    ///
    /// # Returns
    /// `None` if no such user exists
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        crate::metrics::observe_db_query("select", "users", started.elapsed());

        Ok(row?.map(User::from))
    }

    /// Insert a new user with no secret
    ///
    /// # Errors
    /// Fails with a store error if the email is already taken. Callers
    /// check existence first, but that check is not atomic with this insert.
    pub async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let started = Instant::now();
        let result = sqlx::query("INSERT INTO users (email, password) VALUES ($1, $2)")
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await;
        crate::metrics::observe_db_query("insert", "users", started.elapsed());

        result?;
        crate::metrics::USERS_TOTAL.inc();
        Ok(User {
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            secret: None,
        })
    }

    /// Overwrite a user's secret
    ///
    /// A missing row is not an error; nothing is written.
    pub async fn update_secret(&self, email: &str, secret: &str) -> Result<(), AppError> {
        let started = Instant::now();
        let result = sqlx::query("UPDATE users SET secret = $1 WHERE email = $2")
            .bind(secret)
            .bind(email)
            .execute(&self.pool)
            .await;
        crate::metrics::observe_db_query("update", "users", started.elapsed());

        if result?.rows_affected() == 0 {
            tracing::debug!(email = %email, "Secret update matched no user");
        }

        Ok(())
    }

    /// Number of registered users
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let started = Instant::now();
        let count: Result<(i64,), sqlx::Error> = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await;
        crate::metrics::observe_db_query("count", "users", started.elapsed());

        Ok(count?.0)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Store a new session row
    pub async fn insert_session(&self, session: &SessionRecord) -> Result<(), AppError> {
        let started = Instant::now();
        let result = sqlx::query(
            "INSERT INTO sessions (token_hash, email, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token_hash)
        .bind(&session.email)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await;
        crate::metrics::observe_db_query("insert", "sessions", started.elapsed());

        result?;
        Ok(())
    }

    /// Email bound to a session that has not expired at `now`
    pub async fn find_session_email(
        &self,
        token_hash: &str,
        now: i64,
    ) -> Result<Option<String>, AppError> {
        let started = Instant::now();
        let row: Result<Option<(String,)>, sqlx::Error> =
            sqlx::query_as("SELECT email FROM sessions WHERE token_hash = $1 AND expires_at > $2")
                .bind(token_hash)
                .bind(now)
                .fetch_optional(&self.pool)
                .await;
        crate::metrics::observe_db_query("select", "sessions", started.elapsed());

        Ok(row?.map(|(email,)| email))
    }

    /// Remove a session row; absent rows are fine
    pub async fn delete_session(&self, token_hash: &str) -> Result<(), AppError> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await;
        crate::metrics::observe_db_query("delete", "sessions", started.elapsed());

        result?;
        Ok(())
    }

    /// Remove every session that expired at or before `now`
    ///
    /// # Returns
    /// Number of rows removed
    pub async fn delete_expired_sessions(&self, now: i64) -> Result<u64, AppError> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await;
        crate::metrics::observe_db_query("delete_expired", "sessions", started.elapsed());

        Ok(result?.rows_affected())
    }

    /// Close the pool; later queries fail with a store error
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
