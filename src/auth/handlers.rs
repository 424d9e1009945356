//! Authentication API handlers

use crate::api::handlers::AppState;
use crate::auth::middleware::bearer_token;
use crate::auth::models::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, ResetPasswordRequest, SignupRequest,
    SignupResponse,
};
use crate::auth::service::FORGOT_PASSWORD_MESSAGE;
use crate::core::error::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

/// Cookie that clears the `token` cookie a browser client may hold
const CLEAR_TOKEN_COOKIE: &str = "token=; Path=/; Max-Age=0; HttpOnly";

/// Handler for POST /api/auth/signup - User registration
pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;

    let user_id = state.auth.signup(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created".to_string(),
            user_id,
        }),
    ))
}

/// Handler for POST /api/auth/login - User login
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;

    let session = state.auth.login(req).await?;

    Ok(Json(session))
}

/// Handler for POST /api/auth/logout
///
/// Tokens stay valid until they expire; this only tells the browser to drop
/// its cookie.
pub async fn logout() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, CLEAR_TOKEN_COOKIE)],
        Json(MessageResponse::new("Logout successful")),
    )
}

/// Handler for GET /api/auth - Check a bearer session token
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>> {
    state.auth.verify_token(bearer_token(&headers))?;

    Ok(Json(MessageResponse::new("Token is valid")))
}

/// Handler for GET /api/auth/:userId - Public display name of a user
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let name = state.auth.get_user_name(&user_id).await?;

    Ok(Json(name))
}

/// Handler for POST /api/auth/forgotPassword
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(req) = payload?;

    state.auth.forgot_password(&req.email).await?;

    Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)))
}

/// Handler for POST /api/auth/resetPassword/:userId/:token
pub async fn reset_password(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(String, String)>,
    payload: std::result::Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(req) = payload?;

    state.auth.reset_password(&user_id, &token, &req.password).await?;

    Ok(Json(MessageResponse::new("Password reset successfully")))
}
