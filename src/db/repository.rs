//! Repository pattern implementation for data access layer
//!
//! The rest of the crate reaches the store only through these types.

use crate::core::error::{AppError, Result};
use crate::db::manager::DatabaseManager;
use crate::db::models::{Feedback, User};
use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row};
use std::sync::Arc;

/// Lookup and insert operations shared by the repositories
///
/// Deletion is not part of it: user accounts are never deleted.
#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// Find an entity by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<()>;
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Repository for user accounts
pub struct UserRepository {
    db: Arc<DatabaseManager>,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// Find a user by email (exact, case-sensitive match)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                        [&email],
                        user_from_row,
                    )
                    .optional()?)
            })
            .await
    }

    /// Replace the stored password hash. Returns false if no such user exists.
    pub async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        let password_hash = password_hash.to_string();
        self.db
            .execute(move |conn| {
                let updated = conn.execute(
                    "UPDATE users SET password_hash = ? WHERE id = ?",
                    rusqlite::params![&password_hash, &user_id],
                )?;
                Ok(updated > 0)
            })
            .await
    }
}

#[async_trait]
impl Repository<User> for UserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                        [&id],
                        user_from_row,
                    )
                    .optional()?)
            })
            .await
    }

    /// Insert a user; a taken email surfaces as `DuplicateEmail`
    async fn create(&self, user: &User) -> Result<()> {
        let user = user.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO users (id, first_name, last_name, email, password_hash, created_at) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                    rusqlite::params![
                        &user.id,
                        &user.first_name,
                        &user.last_name,
                        &user.email,
                        &user.password_hash,
                        &user.created_at,
                    ],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::DuplicateEmail
                    } else {
                        AppError::DatabaseError(e)
                    }
                })?;
                Ok(())
            })
            .await
    }
}

const FEEDBACK_COLUMNS: &str =
    "id, user_id, first_name, last_name, position, company, relationship, recommendation, created_at";

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<Feedback> {
    Ok(Feedback {
        id: row.get(0)?,
        user_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        position: row.get(4)?,
        company: row.get(5)?,
        relationship: row.get(6)?,
        recommendation: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Repository for feedback entries
pub struct FeedbackRepository {
    db: Arc<DatabaseManager>,
}

impl FeedbackRepository {
    /// Create a new FeedbackRepository
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// All feedback written about a user, newest first
    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<Feedback>> {
        let user_id = user_id.to_string();
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM feedback WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
                    FEEDBACK_COLUMNS
                ))?;

                let entries = stmt
                    .query_map([&user_id], feedback_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(entries)
            })
            .await
    }

    /// Delete a feedback entry by its ID
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                conn.execute("DELETE FROM feedback WHERE id = ?", [&id])?;
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl Repository<Feedback> for FeedbackRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Feedback>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {} FROM feedback WHERE id = ?", FEEDBACK_COLUMNS),
                        [&id],
                        feedback_from_row,
                    )
                    .optional()?)
            })
            .await
    }

    async fn create(&self, feedback: &Feedback) -> Result<()> {
        let feedback = feedback.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO feedback (id, user_id, first_name, last_name, position, company, \
                     relationship, recommendation, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    rusqlite::params![
                        &feedback.id,
                        &feedback.user_id,
                        &feedback.first_name,
                        &feedback.last_name,
                        &feedback.position,
                        &feedback.company,
                        &feedback.relationship,
                        &feedback.recommendation,
                        &feedback.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }
}
