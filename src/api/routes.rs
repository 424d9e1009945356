//! API routes

use crate::api::handlers::{create_feedback, delete_feedback, list_feedback, AppState};
use crate::auth::handlers::{
    forgot_password, get_user, login, logout, reset_password, signup, verify_token,
};
use crate::auth::middleware::authenticate;
use crate::auth::models::MessageResponse;
use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

/// Build the API routes
///
/// Feedback routes share one path pattern: creation is public while listing
/// and deletion sit behind the session gate.
pub fn build_api_routes(state: AppState) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/auth", get(verify_token))
        .route("/api/auth/", get(verify_token))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/forgotPassword", post(forgot_password))
        .route("/api/auth/resetPassword/:userId/:token", post(reset_password))
        .route("/api/auth/:userId", get(get_user))
        .route("/api/feedback/:id", post(create_feedback));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/api/feedback/:id", get(list_feedback).delete(delete_feedback))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(MessageResponse::new("Page not found")))
}
