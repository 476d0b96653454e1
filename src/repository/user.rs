use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::PasswordHasher;
use crate::{AuthError, SecretString};

/// Identifier of the role seeded at initialization.
pub const ADMIN_ROLE: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    /// Identifiers of the roles claimed by this user.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

#[cfg(any(test, feature = "mocks"))]
impl User {
    pub fn mock_from_credentials(email: &str, hashed_password: &str) -> Self {
        User {
            id: 1,
            email: email.to_owned(),
            username: "Test User".to_owned(),
            hashed_password: hashed_password.to_owned(),
            roles: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }
}

/// Registration input. The plaintext password travels separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
}

impl NewUser {
    pub fn new(email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub identifier: String,
    pub description: Option<String>,
}

/// User persistence.
///
/// Implementations must enforce email uniqueness themselves: the
/// `find_user_by_email` check done before registration is only a fast path
/// and races with concurrent signups.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AuthError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// # Errors
    ///
    /// `AuthError::DuplicateEmail` when the email is already present.
    async fn create_user(&self, user: &NewUser, hashed_password: &str) -> Result<User, AuthError>;

    async fn find_role(&self, identifier: &str) -> Result<Option<Role>, AuthError>;

    /// Adds a role claim. Assigning a role the user already has is a no-op.
    ///
    /// # Errors
    ///
    /// `AuthError::RoleNotFound` for an unknown role identifier.
    async fn assign_role(&self, user_id: i64, role: &str) -> Result<(), AuthError>;

    /// Returns the user only if `password` matches the stored hash.
    ///
    /// Unknown email and wrong password both come back as `Ok(None)`. For an
    /// unknown email the password is still hashed once so the two failure
    /// paths cost about the same.
    async fn authorize_by_credentials(
        &self,
        email: &str,
        password: &SecretString,
        hasher: &dyn PasswordHasher,
    ) -> Result<Option<User>, AuthError> {
        let Some(user) = self.find_user_by_email(email).await? else {
            let _ = hasher.hash(password.expose_secret());
            return Ok(None);
        };

        match hasher.verify(password.expose_secret(), &user.hashed_password) {
            Ok(true) => Ok(Some(user)),
            Ok(false) => Ok(None),
            Err(e) => {
                log::error!(
                    target: "gatehouse",
                    "msg=\"stored password hash is unreadable\" user_id={} error=\"{e}\"",
                    user.id
                );
                Ok(None)
            }
        }
    }

    /// Loads a user whose identity was already established by a valid
    /// session. No password check.
    async fn authorize_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        self.find_user_by_id(id).await
    }
}
