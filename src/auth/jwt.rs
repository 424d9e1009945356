//! JWT token generation and validation
//!
//! Session and reset tokens live in separate signing domains: each has its
//! own secret, lifetime and `purpose` claim. Expiry is checked here with zero
//! leeway instead of by `jsonwebtoken`, so tokens are valid while `now < exp`.

use crate::core::config::SecurityConfig;
use crate::core::error::{AppError, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Session,
    Reset,
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub purpose: TokenPurpose,
}

/// Why a token was refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// One signing domain
#[derive(Clone)]
struct TokenSigner {
    purpose: TokenPurpose,
    lifetime_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    fn new(purpose: TokenPurpose, secret: &str, lifetime_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            purpose,
            lifetime_secs: i64::try_from(lifetime_secs).unwrap_or(i64::MAX),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn issue_at(&self, user_id: &str, now: i64) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(self.lifetime_secs),
            purpose: self.purpose,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to sign token: {}", e)))
    }

    fn verify_at(&self, token: &str, now: i64) -> std::result::Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;

        if claims.purpose != self.purpose {
            return Err(TokenError::Invalid("wrong token purpose".to_string()));
        }

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Issues and verifies session and password-reset tokens
#[derive(Clone)]
pub struct TokenService {
    session: TokenSigner,
    reset: TokenSigner,
}

impl TokenService {
    pub fn new(
        session_secret: &str,
        session_ttl_secs: u64,
        reset_secret: &str,
        reset_ttl_secs: u64,
    ) -> Self {
        Self {
            session: TokenSigner::new(TokenPurpose::Session, session_secret, session_ttl_secs),
            reset: TokenSigner::new(TokenPurpose::Reset, reset_secret, reset_ttl_secs),
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(
            &config.session_secret,
            config.session_token_ttl,
            &config.reset_secret,
            config.reset_token_ttl,
        )
    }

    pub fn issue_session(&self, user_id: &str) -> Result<String> {
        self.issue_session_at(user_id, now())
    }

    pub fn issue_session_at(&self, user_id: &str, now: i64) -> Result<String> {
        self.session.issue_at(user_id, now)
    }

    /// Returns the user ID the session token was issued to
    pub fn verify_session(&self, token: &str) -> std::result::Result<String, TokenError> {
        self.verify_session_at(token, now())
    }

    pub fn verify_session_at(&self, token: &str, now: i64) -> std::result::Result<String, TokenError> {
        self.session.verify_at(token, now).map(|claims| claims.sub)
    }

    pub fn issue_reset(&self, user_id: &str) -> Result<String> {
        self.issue_reset_at(user_id, now())
    }

    pub fn issue_reset_at(&self, user_id: &str, now: i64) -> Result<String> {
        self.reset.issue_at(user_id, now)
    }

    /// Returns the user ID the reset token was issued to
    pub fn verify_reset(&self, token: &str) -> std::result::Result<String, TokenError> {
        self.verify_reset_at(token, now())
    }

    pub fn verify_reset_at(&self, token: &str, now: i64) -> std::result::Result<String, TokenError> {
        self.reset.verify_at(token, now).map(|claims| claims.sub)
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3600;
    const MINUTE: i64 = 60;
    const T: i64 = 1_700_000_000;

    fn service() -> TokenService {
        TokenService::new("session-secret", 4 * HOUR as u64, "reset-secret", HOUR as u64)
    }

    #[test]
    fn test_session_token_lifetime() {
        let tokens = service();
        let token = tokens.issue_session_at("user-1", T).unwrap();

        assert_eq!(
            tokens.verify_session_at(&token, T + 3 * HOUR + 59 * MINUTE),
            Ok("user-1".to_string())
        );
        assert_eq!(
            tokens.verify_session_at(&token, T + 4 * HOUR + MINUTE),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_expiry_has_no_leeway() {
        let tokens = service();
        let token = tokens.issue_reset_at("user-1", T).unwrap();

        assert!(tokens.verify_reset_at(&token, T + HOUR - 1).is_ok());
        assert_eq!(tokens.verify_reset_at(&token, T + HOUR), Err(TokenError::Expired));
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let tokens = service();
        let session = tokens.issue_session_at("user-1", T).unwrap();
        let reset = tokens.issue_reset_at("user-1", T).unwrap();

        assert!(matches!(
            tokens.verify_session_at(&reset, T + 1),
            Err(TokenError::Invalid(_))
        ));
        assert!(matches!(
            tokens.verify_reset_at(&session, T + 1),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_purpose_is_checked_even_with_shared_secret() {
        let tokens = TokenService::new("same", 4 * HOUR as u64, "same", HOUR as u64);
        let reset = tokens.issue_reset_at("user-1", T).unwrap();

        assert_eq!(
            tokens.verify_session_at(&reset, T + 1),
            Err(TokenError::Invalid("wrong token purpose".to_string()))
        );
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let tokens = service();
        let token = tokens.issue_session_at("user-1", T).unwrap();

        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let other = tokens.issue_session_at("user-2", T).unwrap();
        parts[1] = other.split('.').nth(1).unwrap().to_string();
        let forged = parts.join(".");

        assert!(matches!(
            tokens.verify_session_at(&forged, T + 1),
            Err(TokenError::Invalid(_))
        ));
        assert!(matches!(
            tokens.verify_session_at("not.a.jwt", T + 1),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let ours = service();
        let theirs = TokenService::new("other-secret", 4 * HOUR as u64, "reset-secret", HOUR as u64);
        let token = theirs.issue_session_at("user-1", T).unwrap();

        assert!(matches!(
            ours.verify_session_at(&token, T + 1),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_wall_clock_variants() {
        let tokens = service();
        let token = tokens.issue_session("user-1").unwrap();
        assert_eq!(tokens.verify_session(&token), Ok("user-1".to_string()));
    }
}
