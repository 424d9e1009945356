//! Password hashing and verification using bcrypt
//!
//! Both operations are CPU-bound, so they run on the blocking thread pool.

use crate::core::error::{AppError, Result};
use tokio::task;

/// bcrypt hasher with a fixed work factor
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password. The output embeds its own salt and cost.
    pub async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.cost;

        task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::TaskError(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| AppError::InternalError(format!("Failed to hash password: {}", e)))
    }

    /// Check a password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; a hash that cannot be parsed is an error.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();

        task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::TaskError(format!("Password verification task failed: {}", e)))?
            .map_err(|e| AppError::InternalError(format!("Failed to verify password: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_is_not_plaintext_and_verifies() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("Passw0rd").await.unwrap();

        assert_ne!(hash, "Passw0rd");
        assert!(hash.starts_with("$2b$04$"));
        assert!(hasher.verify("Passw0rd", &hash).await.unwrap());
        assert!(!hasher.verify("Passw0rD", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let hasher = PasswordHasher::new(4);
        let first = hasher.hash("Passw0rd").await.unwrap();
        let second = hasher.hash("Passw0rd").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_malformed_hash_is_an_error() {
        let hasher = PasswordHasher::new(4);
        let result = hasher.verify("Passw0rd", "not-a-bcrypt-hash").await;
        assert!(matches!(result, Err(AppError::InternalError(_))));
    }
}
