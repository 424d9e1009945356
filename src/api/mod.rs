//! REST API module
//!
//! This module provides the HTTP server and REST API endpoints including:
//! - API routing and request handling
//! - Feedback handlers
//! - Request tracing middleware

pub mod server;
pub mod routes;
pub mod middleware;
pub mod handlers;
pub mod models;

pub use server::ApiServer;
pub use handlers::AppState;
pub use middleware::{trace_id_middleware, TraceId, TRACE_ID_HEADER};
