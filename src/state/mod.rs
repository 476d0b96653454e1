//! Resolved authentication state and its process-local cache.

mod cache;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::User;

pub use cache::AuthStateCache;

/// Public identity of an authenticated user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub roles: BTreeSet<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            roles: user.roles.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "principal", rename_all = "snake_case")]
pub enum AuthState {
    Anonymous,
    Authenticated(Principal),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            Self::Anonymous => None,
        }
    }

    /// True if authenticated and holding at least one of `roles`.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.principal()
            .is_some_and(|p| roles.iter().any(|role| p.has_role(role)))
    }
}

impl From<&User> for AuthState {
    fn from(user: &User) -> Self {
        Self::Authenticated(Principal::from(user))
    }
}
