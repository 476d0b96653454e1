use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};

use super::{database_error, from_millis, is_unique_violation};
use crate::{AuthError, NewUser, Role, User, UserRepository};

#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn roles_of(&self, user_id: i64) -> Result<BTreeSet<String>, AuthError> {
        let roles: Vec<String> = sqlx::query_scalar(
            "SELECT r.identifier FROM roles r JOIN role_claims c ON c.role_id = r.id WHERE c.user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("roles_of", e))?;

        Ok(roles.into_iter().collect())
    }

    async fn with_roles(&self, row: Option<UserRecord>) -> Result<Option<User>, AuthError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let roles = self.roles_of(row.id).await?;
        Ok(Some(row.into_user(roles)?))
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    username: String,
    hashed_password: String,
    created_at: i64,
}

impl UserRecord {
    fn into_user(self, roles: BTreeSet<String>) -> Result<User, AuthError> {
        Ok(User {
            id: self.id,
            email: self.email,
            username: self.username,
            hashed_password: self.hashed_password,
            roles,
            created_at: from_millis("users.created_at", self.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct RoleRecord {
    id: i64,
    identifier: String,
    description: Option<String>,
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        let row: Option<UserRecord> = sqlx::query_as(
            "SELECT id, email, username, hashed_password, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find_user_by_id", e))?;

        self.with_roles(row).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, email), err))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let row: Option<UserRecord> = sqlx::query_as(
            "SELECT id, email, username, hashed_password, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find_user_by_email", e))?;

        self.with_roles(row).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, user, hashed_password), err)
    )]
    async fn create_user(&self, user: &NewUser, hashed_password: &str) -> Result<User, AuthError> {
        let row: UserRecord = sqlx::query_as(
            "INSERT INTO users (email, username, hashed_password, created_at) VALUES (?, ?, ?, ?) RETURNING id, email, username, hashed_password, created_at",
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(hashed_password)
        .bind(Utc::now().timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::DuplicateEmail
            } else {
                database_error("create_user", e)
            }
        })?;

        row.into_user(BTreeSet::new())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_role(&self, identifier: &str) -> Result<Option<Role>, AuthError> {
        let row: Option<RoleRecord> =
            sqlx::query_as("SELECT id, identifier, description FROM roles WHERE identifier = ?")
                .bind(identifier)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error("find_role", e))?;

        Ok(row.map(|r| Role {
            id: r.id,
            identifier: r.identifier,
            description: r.description,
        }))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn assign_role(&self, user_id: i64, role: &str) -> Result<(), AuthError> {
        let Some(found) = self.find_role(role).await? else {
            return Err(AuthError::RoleNotFound(role.to_owned()));
        };

        sqlx::query("INSERT OR IGNORE INTO role_claims (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(found.id)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("assign_role", e))?;

        Ok(())
    }
}
