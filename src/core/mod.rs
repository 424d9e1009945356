//! Core application module
//!
//! This module provides:
//! - Configuration management
//! - Structured logging system
//! - Error handling and type system
//! - Input validation rules

pub mod config;
pub mod logging;
pub mod error;
pub mod validation;

pub use config::Config;
pub use logging::Logger;
pub use error::{AppError, ErrorResponse, Result};
