pub mod feedback;

pub use feedback::*;

use crate::auth::{AuthService, PasswordHasher, TokenService};
use crate::core::config::Config;
use crate::db::manager::DatabaseManager;
use crate::db::repository::{FeedbackRepository, UserRepository};
use crate::mail::Mailer;
use std::sync::Arc;

/// Shared application state for handlers
///
/// Built once at start-up and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub tokens: Arc<TokenService>,
    pub feedback_repo: Arc<FeedbackRepository>,
}

impl AppState {
    pub fn new(config: Config, db: Arc<DatabaseManager>, mailer: Arc<dyn Mailer>) -> Self {
        let user_repo = Arc::new(UserRepository::new(db.clone()));
        let feedback_repo = Arc::new(FeedbackRepository::new(db));
        let tokens = Arc::new(TokenService::from_config(&config.security));

        let auth = Arc::new(AuthService::new(
            user_repo,
            tokens.clone(),
            PasswordHasher::new(config.security.bcrypt_cost),
            mailer,
            config.app.public_base_url.clone(),
        ));

        Self {
            auth,
            tokens,
            feedback_repo,
        }
    }
}

/// State over an in-memory store and a recording mailer
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    test_state_with_mailer(Arc::new(crate::mail::RecordingMailer::new()))
}

#[cfg(test)]
pub(crate) fn test_state_with_mailer(mailer: Arc<dyn Mailer>) -> AppState {
    let db = Arc::new(DatabaseManager::new_in_memory().unwrap());
    AppState::new(crate::core::config::test_config(), db, mailer)
}
