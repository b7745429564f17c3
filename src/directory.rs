//! User directory: staff-ID lookup behind a trait seam.
//!
//! The pipelines only need one query — staff ID to email — so the seam is a
//! single-method trait. The shipped implementation is SQLite via sqlx, but
//! tests (and any caller with a different directory backend) can implement
//! [`UserDirectory`] directly.

use crate::error::DispatchError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// A user record. Read-only from this crate's point of view; the directory
/// is owned by the payroll system.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub staff_id: i64,
    pub email: String,
}

/// Lookup seam mapping a staff identifier to a user record.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find the user with the given unique staff ID, if any.
    async fn find_by_staff_id(&self, staff_id: i64) -> Result<Option<User>, DispatchError>;
}

/// SQLite-backed user directory.
pub struct SqliteUserDirectory {
    pool: SqlitePool,
}

impl SqliteUserDirectory {
    /// Open (creating if missing) the database at `url`, e.g. `sqlite:users.db`,
    /// and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, DispatchError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let directory = Self { pool };
        directory.migrate().await?;
        Ok(directory)
    }

    /// Create the `users` table and its staff-ID index if absent.
    async fn migrate(&self) -> Result<(), DispatchError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id       TEXT PRIMARY KEY,
                staff_id INTEGER NOT NULL UNIQUE,
                email    TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_staff_id ON users(staff_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert or replace a user record.
    pub async fn insert_user(&self, user: &User) -> Result<(), DispatchError> {
        sqlx::query("INSERT OR REPLACE INTO users (id, staff_id, email) VALUES (?, ?, ?)")
            .bind(&user.id)
            .bind(user.staff_id)
            .bind(&user.email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Close the connection pool. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn find_by_staff_id(&self, staff_id: i64) -> Result<Option<User>, DispatchError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, staff_id, email FROM users WHERE staff_id = ?",
        )
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
