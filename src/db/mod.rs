//! Database module
//!
//! This module provides database management functionality including:
//! - Database connection pool management
//! - Repository pattern implementations
//! - Database migrations
//! - Data models

pub mod manager;
pub mod models;
pub mod repository;
pub mod migrations;

pub use manager::DatabaseManager;
pub use models::{Feedback, User};
pub use repository::{FeedbackRepository, Repository, UserRepository};
