//! Data layer module
//!
//! The only code that talks to the relational datastore:
//! - Users (lookup, insert, secret updates)
//! - Server-side session rows

mod database;
mod models;

pub use database::Database;
pub use models::*;
