//! Database models
//!
//! Records as they are stored. API-facing shapes live next to the handlers.

use serde::{Deserialize, Serialize};

/// User account record
///
/// `password_hash` is a self-describing bcrypt digest, never plaintext.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

/// A recommendation written about a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(rename = "_id")]
    pub id: String,
    /// The user the recommendation is about, and the only one allowed to delete it
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub company: String,
    pub relationship: String,
    pub recommendation: String,
    pub created_at: String,
}
