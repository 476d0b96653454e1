use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;

use super::{AuthState, Principal};
use crate::events::{AuthEvent, EventDispatcher, RejectionReason, StateNotifier};
use crate::storage::TokenStorage;
use crate::validator::{SessionValidator, TokenStatus};
use crate::{AuthError, SessionRepository, UserRepository};

#[derive(Debug, Clone)]
struct CacheEntry {
    state: AuthState,
    cached_at: DateTime<Utc>,
}

/// Process-local cache of the resolved [`AuthState`].
///
/// A cached state younger than `ttl` is returned without touching the token
/// storage or either store. An older or missing one is recomputed from the
/// stored token:
///
/// 1. no token (or a blank one) resolves to `Anonymous`;
/// 2. a token that is unknown or expired resolves to `Anonymous`;
/// 3. a valid token whose user no longer exists resolves to `Anonymous`;
/// 4. otherwise the user's [`Principal`] is `Authenticated`.
///
/// Resolution never fails. Token storage errors (for example a value sealed
/// under a rotated key) delete the stored token and resolve to `Anonymous`.
/// Store errors also resolve to `Anonymous`, but that result is not cached
/// so the next call retries.
///
/// Recomputations are single-flight. One that overlaps an
/// [`invalidate`](Self::invalidate) or [`set`](Self::set) neither stores nor
/// publishes its result; the caller gets the newer cached state instead, or
/// the unpublished result while nothing is cached.
pub struct AuthStateCache<S, U, T>
where
    S: SessionRepository,
    U: UserRepository,
    T: TokenStorage,
{
    validator: SessionValidator<S>,
    users: U,
    storage: T,
    token_key: String,
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
    generation: AtomicU64,
    refresh: tokio::sync::Mutex<()>,
    notifier: StateNotifier,
    events: EventDispatcher,
}

impl<S, U, T> AuthStateCache<S, U, T>
where
    S: SessionRepository,
    U: UserRepository,
    T: TokenStorage,
{
    pub fn new(
        sessions: S,
        users: U,
        storage: T,
        token_key: impl Into<String>,
        ttl: Duration,
        notifier: StateNotifier,
    ) -> Self {
        Self {
            validator: SessionValidator::new(sessions),
            users,
            storage,
            token_key: token_key.into(),
            ttl,
            entry: Mutex::new(None),
            generation: AtomicU64::new(0),
            refresh: tokio::sync::Mutex::new(()),
            notifier,
            events: EventDispatcher::new(),
        }
    }

    /// Sends [`AuthEvent::SessionRejected`] to `events`.
    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn validator(&self) -> &SessionValidator<S> {
        &self.validator
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    pub fn storage(&self) -> &T {
        &self.storage
    }

    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "get_auth_state", skip_all)
    )]
    pub async fn get_state(&self, now: DateTime<Utc>) -> AuthState {
        if let Some(state) = self.fresh(now) {
            return state;
        }

        let _refresh = self.refresh.lock().await;
        if let Some(state) = self.fresh(now) {
            return state;
        }

        let generation = self.generation.load(Ordering::SeqCst);
        match self.resolve(now).await {
            Ok(state) => {
                if self.commit(generation, &state, now) {
                    state
                } else {
                    self.cached().unwrap_or(state)
                }
            }
            Err(e) => {
                log::error!(
                    target: "gatehouse::state",
                    "msg=\"failed to resolve auth state\" error=\"{e}\""
                );
                AuthState::Anonymous
            }
        }
    }

    /// Drops the cached state regardless of its age.
    pub fn invalidate(&self) {
        match self.entry.lock() {
            Ok(mut entry) => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                *entry = None;
            }
            Err(_) => log::error!(target: "gatehouse::state", "msg=\"cache lock poisoned\""),
        }
    }

    /// Replaces the cached state, discarding any recomputation in flight.
    pub fn set(&self, state: AuthState, now: DateTime<Utc>) {
        match self.entry.lock() {
            Ok(mut entry) => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                *entry = Some(CacheEntry {
                    state,
                    cached_at: now,
                });
            }
            Err(_) => log::error!(target: "gatehouse::state", "msg=\"cache lock poisoned\""),
        }
    }

    /// Publishes `state` to every subscriber and returns how many there were.
    pub fn notify_changed(&self, state: AuthState) -> usize {
        // ordered against `commit`, which publishes under the same lock
        let _entry = self.entry.lock();
        self.notifier.publish(state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthState> {
        self.notifier.subscribe()
    }

    /// The last cached state, however old.
    pub fn cached(&self) -> Option<AuthState> {
        self.entry
            .lock()
            .ok()
            .and_then(|entry| entry.as_ref().map(|e| e.state.clone()))
    }

    fn fresh(&self, now: DateTime<Utc>) -> Option<AuthState> {
        let entry = self.entry.lock().ok()?;
        let entry = entry.as_ref()?;
        (now.signed_duration_since(entry.cached_at) < self.ttl).then(|| entry.state.clone())
    }

    /// Caches a recomputed state and publishes it if it changed, unless an
    /// `invalidate` or `set` happened after `generation` was read.
    fn commit(&self, generation: u64, state: &AuthState, now: DateTime<Utc>) -> bool {
        let Ok(mut entry) = self.entry.lock() else {
            return false;
        };
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!(
                target: "gatehouse::state",
                "msg=\"discarding state resolved before invalidation\""
            );
            return false;
        }
        *entry = Some(CacheEntry {
            state: state.clone(),
            cached_at: now,
        });
        if let Some(receivers) = self.notifier.publish_if_changed(state) {
            log::debug!(
                target: "gatehouse::state",
                "msg=\"auth state changed\" authenticated={} receivers={receivers}",
                state.is_authenticated()
            );
        }
        true
    }

    async fn resolve(&self, now: DateTime<Utc>) -> Result<AuthState, AuthError> {
        let token = match self.storage.get(&self.token_key).await {
            Ok(Some(token)) if !token.is_blank() => token,
            Ok(_) => return Ok(AuthState::Anonymous),
            Err(e) => {
                log::warn!(
                    target: "gatehouse::state",
                    "msg=\"stored token unreadable, clearing it\" error=\"{e}\""
                );
                if let Err(e) = self.storage.delete(&self.token_key).await {
                    log::warn!(
                        target: "gatehouse::state",
                        "msg=\"failed to clear unreadable token\" error=\"{e}\""
                    );
                }
                return Ok(AuthState::Anonymous);
            }
        };

        let user_id = match self.validator.check(token.expose_secret(), now).await? {
            TokenStatus::Valid { user_id } => user_id,
            TokenStatus::Unknown => {
                self.reject(None, RejectionReason::UnknownToken, now).await;
                return Ok(AuthState::Anonymous);
            }
            TokenStatus::Expired { user_id } => {
                self.reject(Some(user_id), RejectionReason::Expired, now)
                    .await;
                return Ok(AuthState::Anonymous);
            }
        };

        match self.users.authorize_by_id(user_id).await? {
            Some(user) => Ok(AuthState::Authenticated(Principal::from(&user))),
            None => {
                log::warn!(
                    target: "gatehouse::state",
                    "msg=\"session references missing user\" user_id={user_id}"
                );
                self.reject(Some(user_id), RejectionReason::UserMissing, now)
                    .await;
                Ok(AuthState::Anonymous)
            }
        }
    }

    async fn reject(&self, user_id: Option<i64>, reason: RejectionReason, now: DateTime<Utc>) {
        self.events
            .dispatch(AuthEvent::SessionRejected {
                user_id,
                reason,
                at: now,
            })
            .await;
    }
}
