use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::crypto::hash_token;
use crate::{AuthError, StoreError};

use super::session::{NewSession, Session, SessionRepository};

/// A session row as the mock keeps it: token digest only.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// In-memory [`SessionRepository`] with call counting and failure injection.
#[derive(Clone)]
pub struct MockSessionRepository {
    pub sessions: Arc<Mutex<Vec<StoredSession>>>,
    next_id: Arc<AtomicI64>,
    calls: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<StoreError>>>,
}

impl MockSessionRepository {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(vec![])),
            next_id: Arc::new(AtomicI64::new(1)),
            calls: Arc::new(AtomicUsize::new(0)),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, error: Option<StoreError>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = error;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enter(&self) -> Result<(), AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.failure.lock().map_err(|_| StoreError::LockPoisoned)?;
        match failure.as_ref() {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    fn sessions(&self) -> Result<MutexGuard<'_, Vec<StoredSession>>, AuthError> {
        Ok(self.sessions.lock().map_err(|_| StoreError::LockPoisoned)?)
    }
}

impl Default for MockSessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRepository for MockSessionRepository {
    async fn create_session(&self, session: NewSession) -> Result<Session, AuthError> {
        self.enter()?;
        let token_hash = hash_token(session.token().expose_secret());

        let mut sessions = self.sessions()?;
        if sessions.iter().any(|s| s.token_hash == token_hash) {
            return Err(StoreError::UniqueViolation("sessions.token_hash").into());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        sessions.push(StoredSession {
            id,
            user_id: session.user_id(),
            token_hash,
            created_at: session.created_at(),
            valid_until: session.valid_until(),
        });
        drop(sessions);

        Ok(session.into_session(id))
    }

    async fn is_valid_session(
        &self,
        token: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        self.enter()?;
        let token_hash = hash_token(token);
        Ok(self
            .sessions()?
            .iter()
            .any(|s| s.token_hash == token_hash && s.user_id == user_id && s.valid_until > now))
    }

    async fn get_user_id_by_token(&self, token: &str) -> Result<Option<i64>, AuthError> {
        self.enter()?;
        let token_hash = hash_token(token);
        Ok(self
            .sessions()?
            .iter()
            .find(|s| s.token_hash == token_hash)
            .map(|s| s.user_id))
    }

    async fn revoke_session(&self, token: &str) -> Result<(), AuthError> {
        self.enter()?;
        let token_hash = hash_token(token);
        self.sessions()?.retain(|s| s.token_hash != token_hash);
        Ok(())
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        self.enter()?;
        let mut sessions = self.sessions()?;
        let before = sessions.len();
        sessions.retain(|s| s.valid_until > now);
        let pruned = before.saturating_sub(sessions.len());
        Ok(u64::try_from(pruned).unwrap_or(u64::MAX))
    }
}
