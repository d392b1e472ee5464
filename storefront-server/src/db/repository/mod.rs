//! Repository Module
//!
//! Free functions over `&SqlitePool` (reads, standalone writes) and
//! `&mut Transaction` (steps of a larger unit of work).

pub mod order;
pub mod product;

use crate::utils::{AppError, ErrorCode};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// SQLite transaction handle used by multi-statement operations
pub type Tx<'c> = sqlx::Transaction<'c, sqlx::Sqlite>;

/// Write transaction that takes the SQLite write lock at `BEGIN`.
///
/// A deferred transaction upgrading from read to write gets `SQLITE_BUSY`
/// immediately; `busy_timeout` only applies to lock acquisition at `BEGIN IMMEDIATE`.
pub async fn begin_write(pool: &sqlx::SqlitePool) -> Result<Tx<'static>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// True when SQLite reports a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => AppError::not_found(what),
            RepoError::Duplicate(what) => {
                AppError::with_message(ErrorCode::AlreadyExists, format!("{what} already exists"))
            }
            RepoError::Database(e) => {
                tracing::error!(error = %e, "Repository database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

/// `?,?,?` placeholder list for a runtime IN clause
pub(crate) fn placeholders(n: usize) -> String {
    std::iter::repeat_n("?", n).collect::<Vec<_>>().join(",")
}
