mod gateway;
mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction};

pub use gateway::{
    Deletable, Insertable, Query, Queryable, Updatable, delete, delete_by_id, insert,
    is_constraint_violation, query, query_one, update,
};
pub use schema::Table;

use schema::INITIAL_SCHEMA;

/// Database wrapper providing connection management and schema initialization.
///
/// The single SQLite connection sits behind a mutex so one `Database` can be
/// shared by every request handler.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically initializes the schema on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file and its parent directory if they do not
    /// exist. Automatically initializes the schema on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure_database_directory(path)?;

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Locks and returns the underlying connection.
    ///
    /// A poisoned lock is recovered rather than propagated.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Database mutex was poisoned, recovering connection");
            poisoned.into_inner()
        })
    }

    /// Runs `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back and logs when it returns
    /// `Err`. The connection stays locked for the duration of the closure.
    ///
    /// # Examples
    ///
    /// ```
    /// use pathfork::Database;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let db = Database::in_memory()?;
    /// db.transaction(|tx| {
    ///     tx.execute(
    ///         "INSERT INTO tbl_user (email, pw) VALUES ('a@b.com', 'x')",
    ///         [],
    ///     )?;
    ///     Ok(())
    /// })?;
    ///
    /// let count: i64 = db
    ///     .connection()
    ///     .query_row("SELECT COUNT(*) FROM tbl_user", [], |row| row.get(0))?;
    /// assert_eq!(count, 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                tracing::error!("Transaction error, rollback: {:#}", e);
                if let Err(rollback) = tx.rollback() {
                    tracing::error!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }
}

/// Applies the schema. Every statement is `IF NOT EXISTS`, so reopening an
/// existing database is a no-op.
fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    conn.execute_batch(INITIAL_SCHEMA)
        .context("Failed to initialize database schema")?;
    Ok(())
}

/// Ensures the parent directory of the database file exists.
fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
