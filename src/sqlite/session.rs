use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{database_error, is_unique_violation};
use crate::crypto::hash_token;
use crate::{AuthError, NewSession, Session, SessionRepository, StoreError};

#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, err))]
    async fn create_session(&self, session: NewSession) -> Result<Session, AuthError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO sessions (user_id, token_hash, created_at, valid_until) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(session.user_id())
        .bind(hash_token(session.token().expose_secret()))
        .bind(session.created_at().timestamp_millis())
        .bind(session.valid_until().timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                log::warn!(target: "gatehouse::sqlite", "msg=\"session token collision\"");
                AuthError::from(StoreError::UniqueViolation("sessions.token_hash"))
            } else {
                database_error("create_session", e)
            }
        })?;

        Ok(session.into_session(id))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, token), err))]
    async fn is_valid_session(
        &self,
        token: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE token_hash = ? AND user_id = ? AND valid_until > ?)",
        )
        .bind(hash_token(token))
        .bind(user_id)
        .bind(now.timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| database_error("is_valid_session", e))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, err))]
    async fn get_user_id_by_token(&self, token: &str) -> Result<Option<i64>, AuthError> {
        sqlx::query_scalar("SELECT user_id FROM sessions WHERE token_hash = ?")
            .bind(hash_token(token))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("get_user_id_by_token", e))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, err))]
    async fn revoke_session(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("revoke_session", e))?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE valid_until <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("prune_expired", e))?;

        Ok(result.rows_affected())
    }
}
