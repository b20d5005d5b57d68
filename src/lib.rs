//! secrets-auth - registration, local and Google sign-in, and one
//! protected secret per user
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Route Dispatcher (Axum)                   │
//! │  - pages, account, secrets, metrics                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Session Manager                          │
//! │  - cookie token -> server-side session row -> user          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Credential / OAuth Authenticators              │
//! │  - Argon2 password check                                    │
//! │  - Google authorization code flow                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    User Store Gateway                        │
//! │  - sqlx AnyPool (PostgreSQL or SQLite)                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and inline views
//! - `auth`: password hashing, strategies, sessions, extractors
//! - `data`: datastore access
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Session issue/resolve/destroy
    pub sessions: Arc<auth::SessionManager>,

    /// Google OAuth client
    pub google: Arc<auth::GoogleOAuth>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to the datastore and ensure the schema
    /// 2. Build the outbound HTTP client
    /// 3. Wire the session manager and Google client
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to datastore
        let db = data::Database::connect(
            &config.database.connection_url(),
            config.database.max_connections,
        )
        .await?;
        let users = db.count_users().await?;
        metrics::USERS_TOTAL.set(users);
        tracing::info!(users, "Database connected");

        // 2. Initialize HTTP client
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("secrets-auth/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        // 3. Sessions and OAuth
        let db = Arc::new(db);
        let sessions = auth::SessionManager::new(
            db.clone(),
            config.auth.session_secret.clone(),
            config.auth.session_max_age,
        );
        let google = auth::GoogleOAuth::new(config.auth.google.clone(), http_client);

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            sessions: Arc::new(sessions),
            google: Arc::new(google),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::secrets_router())
        .merge(api::account_router())
        .merge(auth::auth_router())
        .merge(api::metrics_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
