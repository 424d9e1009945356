//! Database manager implementation
//!
//! SQLite connection pool (r2d2) with an async wrapper that moves every
//! query onto the blocking thread pool.

use crate::core::error::{AppError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;

/// Database manager with connection pool
#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<SqliteConnectionManager>,
    db_path: PathBuf,
}

impl DatabaseManager {
    /// Open (or create) the database file and run pending migrations
    pub fn new(db_path: &Path, pool_size: u32, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::ConfigError(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            // WAL lets readers proceed while a password update is being written
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(Duration::from_secs(30))
            .build(manager)
            .map_err(|e| AppError::InternalError(format!("Failed to build connection pool: {}", e)))?;

        let manager = Self {
            pool,
            db_path: db_path.to_path_buf(),
        };

        manager.migrate()?;

        Ok(manager)
    }

    /// Create a new DatabaseManager with an in-memory database for testing
    pub fn new_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();

        // In-memory databases are per connection, so the pool holds exactly one
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_secs(30))
            .build(manager)
            .map_err(|e| AppError::InternalError(format!("Failed to build connection pool: {}", e)))?;

        let manager = Self {
            pool,
            db_path: PathBuf::from(":memory:"),
        };

        manager.migrate()?;

        Ok(manager)
    }

    /// Execute a database operation asynchronously
    ///
    /// The closure runs under `spawn_blocking` so SQLite I/O never stalls the
    /// async runtime.
    pub async fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| AppError::InternalError(format!("No database connection available: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| AppError::TaskError(format!("Database task panicked: {}", e)))?
    }

    /// Execute database migrations
    pub fn migrate(&self) -> Result<()> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| AppError::InternalError(format!("No database connection available: {}", e)))?;
        crate::db::migrations::run_migrations(&mut conn)
    }

    /// Get the database file path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get the current pool size
    pub fn pool_size(&self) -> u32 {
        self.pool.max_size()
    }
}
