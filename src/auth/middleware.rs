//! Authentication middleware
//!
//! Stateless: a valid session token is enough, the user store is not queried.

use crate::api::handlers::AppState;
use crate::core::error::{AppError, Result};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Authenticated caller, stored in request extensions by [`authenticate`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject the request with 401 unless it carries a valid session token
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match state.auth.verify_token(bearer_token(request.headers())) {
        Ok(user_id) => user_id,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(user_id = %user_id, "Request authenticated");
    request.extensions_mut().insert(AuthUser { user_id });

    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_state;
    use axum::{
        body::Body,
        http::{HeaderValue, Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::util::ServiceExt;

    async fn whoami(user: AuthUser) -> String {
        user.user_id
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/protected", get(whoami))
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
            .with_state(state)
    }

    async fn call(app: Router, authorization: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_valid_session_reaches_handler() {
        let state = test_state();
        let token = state.tokens.issue_session("user-1").unwrap();

        let (status, body) = call(app(state), Some(&format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user-1");
    }

    #[tokio::test]
    async fn test_gate_rejects_bad_credentials() {
        let state = test_state();
        let reset = state.tokens.issue_reset("user-1").unwrap();
        let expired = state
            .tokens
            .issue_session_at("user-1", chrono::Utc::now().timestamp() - 5 * 3600)
            .unwrap();
        let session = state.tokens.issue_session("user-1").unwrap();

        let cases = [
            None,
            Some("Bearer garbage".to_string()),
            Some(format!("Token {}", session)),
            Some(format!("Bearer {}", reset)),
            Some(format!("Bearer {}", expired)),
        ];

        for authorization in cases {
            let (status, body) = call(app(state.clone()), authorization.as_deref()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(body.contains("Unauthorized"));
        }
    }

    #[tokio::test]
    async fn test_extractor_without_gate_is_unauthorized() {
        let app = Router::new().route("/protected", get(whoami));
        let (status, _) = call(app, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
