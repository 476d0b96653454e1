use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::TokenStorage;
use crate::{SecretString, TokenStorageError};

/// Process-local [`TokenStorage`]. Clones share the same map.
#[derive(Clone, Default)]
pub struct InMemoryTokenStorage {
    pub(super) values: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl InMemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> TokenStorageError {
    TokenStorageError::Unavailable("lock poisoned".to_owned())
}

#[async_trait]
impl TokenStorage for InMemoryTokenStorage {
    async fn get(&self, key: &str) -> Result<Option<SecretString>, TokenStorageError> {
        Ok(self.values.read().map_err(poisoned)?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &SecretString) -> Result<(), TokenStorageError> {
        self.values
            .write()
            .map_err(poisoned)?
            .insert(key.to_owned(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TokenStorageError> {
        self.values.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}
