//! Client-side token storage.
//!
//! The session token issued at login lives with the client between requests.
//! [`TokenStorage`] abstracts where: memory, files on disk, or anything the
//! embedding application provides. [`ProtectedTokenStorage`] wraps any backend
//! and encrypts values under a secret key, so values written before a key
//! rotation fail to read back with [`TokenStorageError::Unprotect`].

mod file;
mod memory;
#[cfg(any(test, feature = "mocks"))]
mod mock;
mod protected;

use async_trait::async_trait;

use crate::{SecretString, TokenStorageError};

pub use file::FileTokenStorage;
pub use memory::InMemoryTokenStorage;
#[cfg(any(test, feature = "mocks"))]
pub use mock::MockTokenStorage;
pub use protected::ProtectedTokenStorage;

/// Async key-value store for client-held secrets.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<SecretString>, TokenStorageError>;

    async fn set(&self, key: &str, value: &SecretString) -> Result<(), TokenStorageError>;

    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), TokenStorageError>;
}
