//! `SQLite` implementations of the store traits. Requires the `sqlx_sqlite`
//! feature.
//!
//! Timestamps are stored as Unix milliseconds so that validity checks
//! compare integers. Session tokens are stored as SHA-256 digests.

pub mod migrations;
mod session;
mod user;

pub use session::SqliteSessionRepository;
pub use user::SqliteUserRepository;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{AuthError, StoreError};

/// Creates both repositories over one pool.
pub fn create_repositories(pool: SqlitePool) -> (SqliteUserRepository, SqliteSessionRepository) {
    (
        SqliteUserRepository::new(pool.clone()),
        SqliteSessionRepository::new(pool),
    )
}

fn database_error(operation: &'static str, e: sqlx::Error) -> AuthError {
    log::error!(
        target: "gatehouse::sqlite",
        "msg=\"database error\" operation=\"{operation}\" error=\"{e}\""
    );
    StoreError::database(operation, e).into()
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn from_millis(column: &str, millis: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        StoreError::CorruptRecord(format!("{column} out of range: {millis}")).into()
    })
}
