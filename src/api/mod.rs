//! HTTP layer
//!
//! Handlers for:
//! - Home and protected secret pages
//! - Local registration, login and logout
//! - Metrics (Prometheus)

mod account;
pub mod metrics;
mod secrets;
pub mod views;

pub use account::{CredentialsForm, account_router};
pub use metrics::metrics_router;
pub use secrets::{SecretForm, secrets_router};
