//! Account and session operations
//!
//! Coordinates validation, password hashing, the user store, token issuance
//! and reset email delivery. Handlers stay thin and call into this service.

use crate::auth::jwt::TokenService;
use crate::auth::models::{LoginRequest, LoginResponse, SignupRequest, UserNameResponse};
use crate::auth::password::PasswordHasher;
use crate::core::error::{AppError, Result};
use crate::core::validation::{validate_email, validate_names, validate_password};
use crate::db::models::User;
use crate::db::repository::{Repository, UserRepository};
use crate::mail::{reset_password_email, Mailer};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Answer to every forgot-password request, whether or not the account exists
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If this email is associated with an account, a password reset email has been sent.";

/// Answer when a reset names an account that does not exist
pub const RESET_FAILED_MESSAGE: &str = "Password reset failed. Please try again.";

const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

/// Hashed once and verified against when a login names an unknown email
const DUMMY_PASSWORD: &str = "unknown-account-placeholder";

pub struct AuthService {
    user_repo: Arc<UserRepository>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    mailer: Arc<dyn Mailer>,
    public_base_url: String,
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<UserRepository>,
        tokens: Arc<TokenService>,
        hasher: PasswordHasher,
        mailer: Arc<dyn Mailer>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            user_repo,
            tokens,
            hasher,
            mailer,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            dummy_hash: OnceCell::new(),
        }
    }

    /// Register a new account and return its ID.
    ///
    /// Every rule is checked before the store is touched.
    pub async fn signup(&self, request: SignupRequest) -> Result<String> {
        validate_names(&request.first_name, &request.last_name)?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        let password_hash = self.hasher.hash(&request.password).await?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            password_hash,
            created_at: Utc::now().to_rfc3339(),
        };

        if let Err(e) = self.user_repo.create(&user).await {
            if matches!(e, AppError::DuplicateEmail) {
                tracing::warn!("Signup rejected: email already registered");
            }
            return Err(e);
        }

        tracing::info!(user_id = %user.id, "User registered successfully");
        Ok(user.id)
    }

    /// Check credentials and open a session.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller,
    /// in the answer and in the time taken: both paths run one bcrypt verify
    /// at the configured cost.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        validate_email(&request.email)?;

        let user = match self.user_repo.find_by_email(&request.email).await? {
            Some(user) => user,
            None => {
                let dummy = self
                    .dummy_hash
                    .get_or_try_init(|| self.hasher.hash(DUMMY_PASSWORD))
                    .await?;
                self.hasher.verify(&request.password, dummy).await?;

                tracing::warn!("Login failed: unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(&request.password, &user.password_hash).await? {
            tracing::warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue_session(&user.id)?;

        tracing::info!(user_id = %user.id, "Login successful");

        Ok(LoginResponse {
            user_id: user.id,
            token,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        })
    }

    /// Validate a bearer session token and return its user ID
    pub fn verify_token(&self, token: Option<&str>) -> Result<String> {
        let token = token.ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN_MESSAGE.to_string()))?;

        self.tokens.verify_session(token).map_err(|e| {
            tracing::debug!(reason = %e, "Session token rejected");
            AppError::Unauthorized(INVALID_TOKEN_MESSAGE.to_string())
        })
    }

    /// Email a reset link if the address belongs to an account.
    ///
    /// Returns `Ok(())` in both cases so the caller cannot tell them apart.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let user = match self.user_repo.find_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::info!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        let token = self.tokens.issue_reset(&user.id)?;
        let link = self.reset_link(&user.id, &token);

        self.mailer.send(reset_password_email(&user.email, &link)).await?;

        tracing::info!(user_id = %user.id, "Password reset email sent");
        Ok(())
    }

    /// Replace the password of `user_id` using a reset token issued to that user
    pub async fn reset_password(&self, user_id: &str, token: &str, new_password: &str) -> Result<()> {
        validate_password(new_password)?;

        let subject = self.tokens.verify_reset(token).map_err(|e| {
            tracing::warn!(user_id = %user_id, reason = %e, "Reset token rejected");
            AppError::InvalidOrExpiredToken(INVALID_TOKEN_MESSAGE.to_string())
        })?;

        if subject != user_id {
            tracing::warn!(user_id = %user_id, "Reset token issued to another user");
            return Err(AppError::InvalidOrExpiredToken(INVALID_TOKEN_MESSAGE.to_string()));
        }

        if self.user_repo.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound(RESET_FAILED_MESSAGE.to_string()));
        }

        let password_hash = self.hasher.hash(new_password).await?;

        if !self.user_repo.update_password(user_id, &password_hash).await? {
            return Err(AppError::NotFound(RESET_FAILED_MESSAGE.to_string()));
        }

        tracing::info!(user_id = %user_id, "Password reset successfully");
        Ok(())
    }

    pub async fn get_user_name(&self, user_id: &str) -> Result<UserNameResponse> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(UserNameResponse {
            first_name: user.first_name,
            last_name: user.last_name,
        })
    }

    fn reset_link(&self, user_id: &str, token: &str) -> String {
        format!(
            "{}/forgotPassword/reset/{}/{}",
            self.public_base_url, user_id, token
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::INVALID_CREDENTIALS_MESSAGE;
    use crate::db::DatabaseManager;
    use crate::mail::RecordingMailer;

    const T_SECS: i64 = 3600;

    struct Fixture {
        service: AuthService,
        users: Arc<UserRepository>,
        tokens: Arc<TokenService>,
        mailer: Arc<RecordingMailer>,
    }

    fn fixture_with(mailer: RecordingMailer) -> Fixture {
        fixture_with_cost(mailer, 4)
    }

    fn fixture_with_cost(mailer: RecordingMailer, cost: u32) -> Fixture {
        let db = Arc::new(DatabaseManager::new_in_memory().unwrap());
        let users = Arc::new(UserRepository::new(db));
        let tokens = Arc::new(TokenService::new(
            "session-secret",
            4 * T_SECS as u64,
            "reset-secret",
            T_SECS as u64,
        ));
        let mailer = Arc::new(mailer);
        let service = AuthService::new(
            users.clone(),
            tokens.clone(),
            PasswordHasher::new(cost),
            mailer.clone(),
            "http://localhost:3000/",
        );

        Fixture {
            service,
            users,
            tokens,
            mailer,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingMailer::new())
    }

    fn ada() -> SignupRequest {
        SignupRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "Passw0rd".to_string(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_stores_hash_not_plaintext() {
        let f = fixture();
        let user_id = f.service.signup(ada()).await.unwrap();

        let stored = f.users.find_by_id(&user_id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "Passw0rd");
        assert!(PasswordHasher::new(4)
            .verify("Passw0rd", &stored.password_hash)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_signup_validation_happens_before_store_write() {
        let f = fixture();

        let mut weak = ada();
        weak.password = "password".to_string();
        assert!(matches!(
            f.service.signup(weak).await,
            Err(AppError::ValidationError(_))
        ));

        let mut short_name = ada();
        short_name.first_name = "A".to_string();
        assert!(matches!(
            f.service.signup(short_name).await,
            Err(AppError::ValidationError(_))
        ));

        let mut bad_email = ada();
        bad_email.email = "ada@example".to_string();
        assert!(matches!(
            f.service.signup(bad_email).await,
            Err(AppError::ValidationError(_))
        ));

        assert!(f.users.find_by_email("ada@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let f = fixture();
        f.service.signup(ada()).await.unwrap();

        let result = f.service.signup(ada()).await;
        assert!(matches!(result, Err(AppError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_login_returns_session() {
        let f = fixture();
        let user_id = f.service.signup(ada()).await.unwrap();

        let session = f
            .service
            .login(login_request("ada@example.com", "Passw0rd"))
            .await
            .unwrap();

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.first_name, "Ada");
        assert_eq!(session.email, "ada@example.com");
        assert_eq!(f.tokens.verify_session(&session.token), Ok(user_id));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let f = fixture();
        f.service.signup(ada()).await.unwrap();

        let unknown = f
            .service
            .login(login_request("nobody@example.com", "Passw0rd"))
            .await
            .unwrap_err();
        let wrong = f
            .service
            .login(login_request("ada@example.com", "Wrong1234"))
            .await
            .unwrap_err();

        assert_eq!(unknown.status_code(), wrong.status_code());
        assert_eq!(unknown.public_message(), wrong.public_message());
        assert_eq!(unknown.public_message(), INVALID_CREDENTIALS_MESSAGE);
    }

    #[tokio::test]
    async fn test_unknown_email_login_runs_bcrypt_at_configured_cost() {
        let f = fixture();
        assert!(!f.service.dummy_hash.initialized());

        let result = f
            .service
            .login(login_request("nobody@example.com", "Passw0rd"))
            .await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));

        let dummy = f.service.dummy_hash.get().unwrap();
        assert!(dummy.starts_with("$2b$04$"));
    }

    #[tokio::test]
    async fn test_unknown_email_login_takes_as_long_as_wrong_password() {
        let f = fixture_with_cost(RecordingMailer::new(), 8);
        f.service.signup(ada()).await.unwrap();

        // first unknown-email login also builds the dummy hash
        let _ = f.service.login(login_request("nobody@example.com", "x")).await;

        let rounds = 3;
        let mut unknown = std::time::Duration::ZERO;
        let mut wrong = std::time::Duration::ZERO;
        for _ in 0..rounds {
            let start = std::time::Instant::now();
            let _ = f
                .service
                .login(login_request("nobody@example.com", "Wr0ngPass"))
                .await;
            unknown += start.elapsed();

            let start = std::time::Instant::now();
            let _ = f
                .service
                .login(login_request("ada@example.com", "Wr0ngPass"))
                .await;
            wrong += start.elapsed();
        }

        assert!(
            unknown * 4 >= wrong,
            "unknown email {:?} vs wrong password {:?}",
            unknown,
            wrong
        );
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_email() {
        let f = fixture();
        let result = f.service.login(login_request("not-an-email", "Passw0rd")).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_verify_token() {
        let f = fixture();
        let session = f.tokens.issue_session("user-1").unwrap();
        let reset = f.tokens.issue_reset("user-1").unwrap();

        assert_eq!(f.service.verify_token(Some(&session)).unwrap(), "user-1");
        assert!(matches!(f.service.verify_token(None), Err(AppError::Unauthorized(_))));
        assert!(matches!(
            f.service.verify_token(Some(&reset)),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_forgot_password_sends_reset_link() {
        let f = fixture();
        let user_id = f.service.signup(ada()).await.unwrap();

        f.service.forgot_password("ada@example.com").await.unwrap();

        let sent = f.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ada@example.com");

        let prefix = format!("http://localhost:3000/forgotPassword/reset/{}/", user_id);
        let start = sent[0].html.find(&prefix).expect("reset link in email") + prefix.len();
        let token: String = sent[0].html[start..]
            .chars()
            .take_while(|c| *c != '"')
            .collect();
        assert_eq!(f.tokens.verify_reset(&token), Ok(user_id));
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email_is_silent() {
        let f = fixture();
        f.service.forgot_password("nobody@example.com").await.unwrap();
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_forgot_password_mailer_failure() {
        let f = fixture_with(RecordingMailer::failing());
        f.service.signup(ada()).await.unwrap();

        let result = f.service.forgot_password("ada@example.com").await;
        assert!(matches!(result, Err(AppError::EmailDeliveryError(_))));
    }

    #[tokio::test]
    async fn test_reset_password_replaces_hash() {
        let f = fixture();
        let user_id = f.service.signup(ada()).await.unwrap();
        let token = f.tokens.issue_reset(&user_id).unwrap();

        f.service.reset_password(&user_id, &token, "N3wPassword").await.unwrap();

        assert!(f.service.login(login_request("ada@example.com", "N3wPassword")).await.is_ok());
        assert!(matches!(
            f.service.login(login_request("ada@example.com", "Passw0rd")).await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_reset_with_bad_token_leaves_hash_unchanged() {
        let f = fixture();
        let user_id = f.service.signup(ada()).await.unwrap();
        let before = f.users.find_by_id(&user_id).await.unwrap().unwrap().password_hash;

        let expired = f
            .tokens
            .issue_reset_at(&user_id, Utc::now().timestamp() - 2 * T_SECS)
            .unwrap();
        let tampered = format!("{}x", f.tokens.issue_reset(&user_id).unwrap());
        let session = f.tokens.issue_session(&user_id).unwrap();

        for token in [expired, tampered, session] {
            let result = f.service.reset_password(&user_id, &token, "N3wPassword").await;
            assert!(matches!(result, Err(AppError::InvalidOrExpiredToken(_))));
        }

        let after = f.users.find_by_id(&user_id).await.unwrap().unwrap().password_hash;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_reset_token_bound_to_user() {
        let f = fixture();
        let ada_id = f.service.signup(ada()).await.unwrap();

        let mut grace = ada();
        grace.first_name = "Grace".to_string();
        grace.email = "grace@example.com".to_string();
        let grace_id = f.service.signup(grace).await.unwrap();

        let grace_token = f.tokens.issue_reset(&grace_id).unwrap();
        let result = f.service.reset_password(&ada_id, &grace_token, "N3wPassword").await;
        assert!(matches!(result, Err(AppError::InvalidOrExpiredToken(_))));
    }

    #[tokio::test]
    async fn test_reset_unknown_user_and_weak_password() {
        let f = fixture();
        let token = f.tokens.issue_reset("ghost").unwrap();

        let result = f.service.reset_password("ghost", &token, "N3wPassword").await;
        match result {
            Err(AppError::NotFound(message)) => assert_eq!(message, RESET_FAILED_MESSAGE),
            other => panic!("expected NotFound, got {:?}", other),
        }

        let result = f.service.reset_password("ghost", &token, "weak").await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_get_user_name() {
        let f = fixture();
        let user_id = f.service.signup(ada()).await.unwrap();

        let name = f.service.get_user_name(&user_id).await.unwrap();
        assert_eq!(
            name,
            UserNameResponse {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
            }
        );

        assert!(matches!(
            f.service.get_user_name("missing").await,
            Err(AppError::NotFound(_))
        ));
    }
}
