//! Authentication module
//!
//! This module provides authentication functionality including:
//! - User signup and login
//! - Session and password-reset tokens (JWT)
//! - Password hashing and verification
//! - The password reset email flow
//! - Authentication middleware

pub mod jwt;
pub mod password;
pub mod service;
pub mod handlers;
pub mod middleware;
pub mod models;

pub use jwt::{Claims, TokenError, TokenPurpose, TokenService};
pub use password::PasswordHasher;
pub use service::AuthService;
pub use middleware::{authenticate, bearer_token, AuthUser};
