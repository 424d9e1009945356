use crate::api::models::CreateFeedbackRequest;
use crate::auth::middleware::AuthUser;
use crate::auth::models::MessageResponse;
use crate::core::error::{AppError, Result};
use crate::db::repository::Repository;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use super::AppState;

/// Handler for POST /api/feedback/:userId - Leave a recommendation for a user
///
/// Public: recommendations are written by people who have no account.
pub async fn create_feedback(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: std::result::Result<Json<CreateFeedbackRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;
    req.validate()?;

    let feedback = req.into_feedback(&user_id);
    state.feedback_repo.create(&feedback).await?;

    tracing::info!(user_id = %user_id, feedback_id = %feedback.id, "Feedback saved");

    Ok((StatusCode::CREATED, Json(MessageResponse::new("Feedback saved"))))
}

/// Handler for GET /api/feedback/:userId - All recommendations about a user
pub async fn list_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    tracing::debug!(requested_by = %user.user_id, user_id = %user_id, "Listing feedback");

    let entries = state.feedback_repo.find_by_user(&user_id).await?;

    Ok(Json(entries))
}

/// Handler for DELETE /api/feedback/:id - Remove a recommendation
///
/// Only the user the recommendation is about may delete it.
pub async fn delete_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let feedback = state
        .feedback_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Feedback not found".to_string()))?;

    if feedback.user_id != user.user_id {
        tracing::warn!(
            user_id = %user.user_id,
            feedback_id = %id,
            "Refused to delete feedback owned by another user"
        );
        return Err(AppError::Unauthorized("Not authorized".to_string()));
    }

    state.feedback_repo.delete(&id).await?;

    tracing::info!(user_id = %user.user_id, feedback_id = %id, "Feedback deleted");

    Ok(StatusCode::NO_CONTENT)
}
