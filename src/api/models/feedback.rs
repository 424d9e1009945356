use crate::core::error::{AppError, Result};
use crate::db::models::Feedback;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

/// Request body for creating a feedback entry
///
/// Any `_id` or `userId` sent by the client is ignored: the owner always comes
/// from the URL.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateFeedbackRequest {
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub company: String,
    pub relationship: String,
    pub recommendation: String,
}

impl CreateFeedbackRequest {
    /// Every field must be non-empty once surrounding whitespace is removed
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("position", &self.position),
            ("company", &self.company),
            ("relationship", &self.relationship),
            ("recommendation", &self.recommendation),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(AppError::ValidationError(format!("{} is required", name)));
            }
        }

        Ok(())
    }

    /// Build the stored record for `user_id`. Call [`validate`](Self::validate) first.
    pub fn into_feedback(self, user_id: &str) -> Feedback {
        Feedback {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            position: self.position.trim().to_string(),
            company: self.company.trim().to_string(),
            relationship: self.relationship.trim().to_string(),
            recommendation: self.recommendation.trim().to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
