//! Common test utilities for E2E tests

#![allow(dead_code)]

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
    routing::{get, post},
};
use secrets_auth::{AppState, config};
use serde::Deserialize;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    /// Client that does not follow redirects
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance backed by a temporary SQLite
    /// database and a mock Google provider
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let provider = spawn_mock_google().await;

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                url: Some(format!("sqlite:{}?mode=rwc", db_path.display())),
                host: "localhost".to_string(),
                port: 5432,
                name: "secrets".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                max_connections: 1,
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-that-is-32-bytes!".to_string(),
                session_max_age: 604800,
                session_cleanup_interval_seconds: 3600,
                google: config::GoogleOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    callback_url: "http://localhost:3000/auth/google/secrets".to_string(),
                    auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                    token_url: format!("{provider}/token"),
                    userinfo_url: format!("{provider}/userinfo"),
                },
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).await.unwrap();

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = secrets_auth::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{}", addr),
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get full URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }
        request.send().await.expect("request succeeds")
    }

    pub async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).form(form);
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }
        request.send().await.expect("request succeeds")
    }

    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_form(
            "/register",
            &[("username", email), ("password", password)],
            None,
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_form("/login", &[("username", email), ("password", password)], None)
            .await
    }
}

/// Redirect target of a response
pub fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// `name=value` pair for a non-empty cookie set by the response
pub fn cookie_pair(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .find(|pair| pair.starts_with(&prefix) && pair.len() > prefix.len())
        .map(ToString::to_string)
}

/// `session=...` pair set by the response
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    cookie_pair(response, "session")
}

// =============================================================================
// Mock Google provider
// =============================================================================
//
// The authorization code doubles as the access token and as the local
// part of the returned email: code "jack" resolves to jack@gmail.test.
// Code "rejected" fails at the token endpoint; code "anonymous" yields
// a profile without an email.

#[derive(Debug, Deserialize)]
struct TokenRequest {
    grant_type: String,
    code: String,
    client_id: String,
}

async fn mock_token(Form(request): Form<TokenRequest>) -> impl IntoResponse {
    if request.code == "rejected"
        || request.grant_type != "authorization_code"
        || request.client_id != "test-client-id"
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "invalid_grant" })),
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "access_token": request.code,
            "token_type": "Bearer",
            "expires_in": 3599,
        })),
    )
}

async fn mock_userinfo(headers: HeaderMap) -> impl IntoResponse {
    let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({})));
    };

    if token == "anonymous" {
        return (StatusCode::OK, Json(serde_json::json!({ "sub": "0" })));
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "sub": format!("sub-{token}"),
            "email": format!("{token}@gmail.test"),
            "email_verified": true,
            "name": token,
        })),
    )
}

/// Start the mock provider and return its base URL
async fn spawn_mock_google() -> String {
    let app = Router::new()
        .route("/token", post(mock_token))
        .route("/userinfo", get(mock_userinfo));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
