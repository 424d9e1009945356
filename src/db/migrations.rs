//! Database migrations
//!
//! Versioned schema changes, tracked in the `schema_migrations` table and
//! applied in order, one transaction per version.

use crate::core::error::{AppError, Result};
use rusqlite::Connection;
use tracing::{info, warn};

/// Migration version tracking table
const MIGRATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Initial schema (version 1): user accounts
const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Version 2: feedback entries
///
/// `user_id` is not a foreign key: a recommendation may be written for a link
/// before anyone checks that the account still exists.
const MIGRATION_V2: &str = r#"
CREATE TABLE IF NOT EXISTS feedback (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    position TEXT NOT NULL,
    company TEXT NOT NULL,
    relationship TEXT NOT NULL,
    recommendation TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_feedback_user_id ON feedback(user_id, created_at);
"#;

const MIGRATIONS: &[(i64, &str, &str)] = &[
    (1, "User accounts", MIGRATION_V1),
    (2, "Feedback entries", MIGRATION_V2),
];

/// Run all pending database migrations
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    info!("Running database migrations");

    conn.execute_batch(MIGRATION_TABLE)?;

    let current_version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    info!("Current database schema version: {}", current_version);

    for (version, description, sql) in MIGRATIONS {
        if current_version < *version {
            info!("Applying migration v{}: {}", version, description);
            apply_migration(conn, *version, sql)?;
        }
    }

    info!("Database migrations completed successfully");
    Ok(())
}

/// Latest schema version known to this build
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|(version, _, _)| *version).unwrap_or(0)
}

/// Apply a single migration
fn apply_migration(conn: &mut Connection, version: i64, sql: &str) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(sql).map_err(|e| {
        warn!("Migration v{} failed: {}", version, e);
        AppError::DatabaseError(e)
    })?;

    tx.execute("INSERT INTO schema_migrations (version) VALUES (?)", [version])?;

    tx.commit()?;

    info!("Migration v{} applied successfully", version);
    Ok(())
}
