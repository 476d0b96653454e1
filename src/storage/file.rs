//! File-backed token storage.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TokenStorage;
use crate::{SecretString, TokenStorageError};

/// Stores each key as `{key}.json` in a directory.
///
/// Suitable for desktop or CLI clients that need the session token to
/// survive restarts. Pair it with [`ProtectedTokenStorage`](super::ProtectedTokenStorage)
/// so the files are encrypted at rest.
///
/// ```rust,ignore
/// use gatehouse::storage::FileTokenStorage;
///
/// let storage = FileTokenStorage::new("/var/lib/myapp/auth")?;
/// ```
pub struct FileTokenStorage {
    directory: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct StoredValue {
    value: String,
}

impl FileTokenStorage {
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `TokenStorageError::Io` if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, TokenStorageError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|e| {
            TokenStorageError::Io(format!("failed to create token directory: {e}"))
        })?;
        Ok(Self { directory })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, TokenStorageError> {
        // keys become file names; reject anything that could escape the directory
        let allowed = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if key.is_empty() || !key.chars().all(allowed) {
            return Err(TokenStorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.directory.join(format!("{key}.json")))
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn get(&self, key: &str) -> Result<Option<SecretString>, TokenStorageError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| TokenStorageError::Io(format!("failed to read token file: {e}")))?;
        let stored: StoredValue = serde_json::from_str(&content)
            .map_err(|e| TokenStorageError::Unavailable(format!("unreadable token file: {e}")))?;

        Ok(Some(SecretString::new(stored.value)))
    }

    async fn set(&self, key: &str, value: &SecretString) -> Result<(), TokenStorageError> {
        let path = self.path_for(key)?;
        let stored = StoredValue {
            value: value.expose_secret().to_owned(),
        };
        let content = serde_json::to_string(&stored)
            .map_err(|e| TokenStorageError::Io(format!("failed to encode token file: {e}")))?;

        std::fs::write(&path, content)
            .map_err(|e| TokenStorageError::Io(format!("failed to write token file: {e}")))
    }

    async fn delete(&self, key: &str) -> Result<(), TokenStorageError> {
        let path = self.path_for(key)?;
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| TokenStorageError::Io(format!("failed to delete token file: {e}")))?;
        }
        Ok(())
    }
}
