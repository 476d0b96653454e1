use thiserror::Error;

use crate::validators::ValidationError;

/// Errors returned by registration, login, logout and the stores.
///
/// Authentication-state resolution never surfaces these; it degrades to
/// [`AuthState::Anonymous`](crate::AuthState::Anonymous) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Registration with an email that is already taken.
    #[error("a user with this email already exists")]
    DuplicateEmail,

    /// Login failed. Deliberately does not say whether the email exists.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("failed to hash password")]
    PasswordHashError,

    #[error("role not found: {0}")]
    RoleNotFound(String),

    /// A session must end strictly after it starts.
    #[error("session lifetime must be positive")]
    InvalidSessionLifetime,

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    TokenStorage(#[from] TokenStorageError),
}

/// Persistence-layer failures raised by the user and session stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0}")]
    UniqueViolation(&'static str),

    #[error("database error during {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("corrupt record: {0}")]
    CorruptRecord(String),
}

impl StoreError {
    pub fn database(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Database {
            operation,
            message: err.to_string(),
        }
    }
}

/// Failures of the client-side token storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenStorageError {
    /// The backing storage cannot be reached right now.
    #[error("token storage unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decrypted, usually because the protection
    /// key was rotated or the value was tampered with.
    #[error("stored token could not be unprotected")]
    Unprotect,

    #[error("token could not be encrypted for storage")]
    Protect,

    #[error("token storage io error: {0}")]
    Io(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}
