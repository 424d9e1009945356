//! Feedback Backend Library
//!
//! Account management (signup, login, password reset by email) and
//! recommendations that colleagues leave about a user, served over a JSON
//! REST API.

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod mail;

// Re-export commonly used types
pub use api::ApiServer;
pub use crate::core::Config;
pub use db::DatabaseManager;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
