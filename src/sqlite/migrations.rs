//! Bundled `SQLite` schema.
//!
//! ```rust,ignore
//! use gatehouse::sqlite::migrations;
//!
//! let pool = SqlitePool::connect("sqlite://auth.db").await?;
//! migrations::run(&pool).await?;
//! ```

use sqlx::{Executor, SqlitePool};

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "20260101000001_create_users_table",
        include_str!("../../migrations_sqlite/20260101000001_create_users_table.sql"),
    ),
    (
        "20260101000002_create_roles_tables",
        include_str!("../../migrations_sqlite/20260101000002_create_roles_tables.sql"),
    ),
    (
        "20260101000003_create_sessions_table",
        include_str!("../../migrations_sqlite/20260101000003_create_sessions_table.sql"),
    ),
];

/// Applies every migration not yet recorded in `_gatehouse_migrations`.
/// Running it again is a no-op.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    pool.execute(
        r"
        CREATE TABLE IF NOT EXISTS _gatehouse_migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        ",
    )
    .await?;

    for (name, sql) in MIGRATIONS {
        let applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM _gatehouse_migrations WHERE name = ?)",
        )
        .bind(*name)
        .fetch_one(pool)
        .await?;

        if applied {
            continue;
        }

        // statements are split on ';', so migrations must not put one inside a literal
        let mut tx = pool.begin().await?;
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            (&mut *tx).execute(statement).await?;
        }
        sqlx::query("INSERT INTO _gatehouse_migrations (name) VALUES (?)")
            .bind(*name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        log::info!(target: "gatehouse::sqlite", "msg=\"migration applied\" name=\"{name}\"");
    }

    Ok(())
}
