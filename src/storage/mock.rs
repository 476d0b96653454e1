use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{InMemoryTokenStorage, TokenStorage};
use crate::{SecretString, TokenStorageError};

/// [`TokenStorage`] for tests: in-memory values plus call counters,
/// injectable read failures, and calls that can be held mid-flight.
///
/// ```rust,ignore
/// storage.hold_next_get();
/// let resolving = cache.get_state(now);
/// // elsewhere: storage.held().await, act, then storage.release()
/// ```
#[derive(Clone, Default)]
pub struct MockTokenStorage {
    values: InMemoryTokenStorage,
    gets: Arc<AtomicUsize>,
    sets: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
    get_failure: Arc<Mutex<Option<TokenStorageError>>>,
    hold_get: Arc<AtomicBool>,
    hold_set: Arc<AtomicBool>,
    entered: Arc<Notify>,
    resume: Arc<Notify>,
}

impl MockTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `get` fail with `error` until cleared with `None`.
    pub fn fail_get_with(&self, error: Option<TokenStorageError>) {
        if let Ok(mut failure) = self.get_failure.lock() {
            *failure = error;
        }
    }

    /// Writes straight to the backing map without counting a `set`.
    pub fn seed(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.values.values.write() {
            map.insert(key.to_owned(), SecretString::new(value));
        }
    }

    pub fn peek(&self, key: &str) -> Option<SecretString> {
        self.values
            .values
            .read()
            .ok()
            .and_then(|map| map.get(key).cloned())
    }

    /// The next `get` reads its value, then waits for [`release`](Self::release).
    pub fn hold_next_get(&self) {
        self.hold_get.store(true, Ordering::SeqCst);
    }

    /// The next `set` waits for [`release`](Self::release) before writing.
    pub fn hold_next_set(&self) {
        self.hold_set.store(true, Ordering::SeqCst);
    }

    /// Completes once a held call is waiting.
    pub async fn held(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.resume.notify_one();
    }

    async fn pause_if_held(&self, hold: &AtomicBool) {
        if hold.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.resume.notified().await;
        }
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStorage for MockTokenStorage {
    async fn get(&self, key: &str) -> Result<Option<SecretString>, TokenStorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let failure = self
            .get_failure
            .lock()
            .map_err(|_| TokenStorageError::Unavailable("lock poisoned".to_owned()))?
            .clone();
        if let Some(err) = failure {
            return Err(err);
        }
        let value = self.values.get(key).await;
        self.pause_if_held(&self.hold_get).await;
        value
    }

    async fn set(&self, key: &str, value: &SecretString) -> Result<(), TokenStorageError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.pause_if_held(&self.hold_set).await;
        self.values.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), TokenStorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.values.delete(key).await
    }
}
