use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::actions::{
    LoginAction, LoginResponse, LogoutAction, PruneExpiredSessionsAction, RegisterAction,
};
use crate::config::AuthConfig;
use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::events::{AuthEvent, EventDispatcher, Listener, StateNotifier};
use crate::state::{AuthState, AuthStateCache, Principal};
use crate::storage::TokenStorage;
use crate::{AuthError, NewUser, SecretString, SessionRepository, User, UserRepository};

/// Entry point for registration, login, logout and state queries.
///
/// Holds the stores, the client-side token storage and the state cache.
/// Share it behind an `Arc`; every method takes `&self`.
///
/// ```rust,ignore
/// use gatehouse::{AuthConfig, AuthService, NewUser, SecretString};
/// use gatehouse::storage::InMemoryTokenStorage;
///
/// let auth = AuthService::new(users, sessions, InMemoryTokenStorage::new(), AuthConfig::default());
///
/// auth.register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1")).await?;
/// auth.login("a@x.com", &SecretString::new("p1")).await?;
/// assert!(auth.get_authentication_state().await.is_authenticated());
/// ```
pub struct AuthService<U, S, T>
where
    U: UserRepository,
    S: SessionRepository,
    T: TokenStorage,
{
    cache: AuthStateCache<S, U, T>,
    hasher: Box<dyn PasswordHasher>,
    events: EventDispatcher,
    config: AuthConfig,
}

impl<U, S, T> AuthService<U, S, T>
where
    U: UserRepository,
    S: SessionRepository,
    T: TokenStorage,
{
    /// Uses [`Argon2Hasher::default`] for passwords.
    pub fn new(users: U, sessions: S, storage: T, config: AuthConfig) -> Self {
        let events = EventDispatcher::new();
        let cache = AuthStateCache::new(
            sessions,
            users,
            storage,
            config.token_storage_key.clone(),
            config.state_cache_ttl,
            StateNotifier::new(config.notification_capacity),
        )
        .with_events(events.clone());

        Self {
            cache,
            hasher: Box::new(Argon2Hasher::default()),
            events,
            config,
        }
    }

    pub fn with_hasher(mut self, hasher: impl PasswordHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn with_listener(self, listener: impl Listener) -> Self {
        self.events.listen(listener);
        self
    }

    pub fn users(&self) -> &U {
        self.cache.users()
    }

    pub fn sessions(&self) -> &S {
        self.cache.validator().sessions()
    }

    pub fn storage(&self) -> &T {
        self.cache.storage()
    }

    pub fn cache(&self) -> &AuthStateCache<S, U, T> {
        &self.cache
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// # Errors
    ///
    /// `AuthError::Validation` for rejected input, `AuthError::DuplicateEmail`
    /// if the email is taken.
    pub async fn register(&self, user: &NewUser, password: &SecretString) -> Result<User, AuthError> {
        RegisterAction::new(
            self.users(),
            self.hasher.as_ref(),
            &self.config.password_policy,
            &self.events,
        )
        .execute(user, password, Utc::now())
        .await
    }

    /// Logs in with email and password; see [`login_at`](Self::login_at).
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<LoginResponse, AuthError> {
        self.login_at(email, password, Utc::now()).await
    }

    /// Opens a session starting at `now`, stores its token client-side and
    /// caches the resulting `Authenticated` state. Subscribers receive that
    /// state exactly once.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredentials` for an unknown email or wrong password
    /// - `AuthError::TokenStorage` if the token cannot be stored; the new
    ///   session is revoked again and the cached state is left untouched
    pub async fn login_at(
        &self,
        email: &str,
        password: &SecretString,
        now: DateTime<Utc>,
    ) -> Result<LoginResponse, AuthError> {
        let response = LoginAction::new(
            self.users(),
            self.sessions(),
            self.hasher.as_ref(),
            &self.events,
            self.config.session_lifetime,
            self.config.token_length,
        )
        .execute(email, password, now)
        .await?;

        let token = &response.session.token;
        if let Err(e) = self.storage().set(self.cache.token_key(), token).await {
            log::error!(
                target: "gatehouse",
                "msg=\"failed to store session token\" user_id={} error=\"{e}\"",
                response.user.id
            );
            if let Err(revoke) = self.sessions().revoke_session(token.expose_secret()).await {
                log::warn!(
                    target: "gatehouse",
                    "msg=\"failed to revoke unstored session\" error=\"{revoke}\""
                );
            }
            return Err(e.into());
        }

        let state = AuthState::from(&response.user);
        self.cache.invalidate();
        self.cache.set(state.clone(), now);
        self.cache.notify_changed(state);

        Ok(response)
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.logout_at(Utc::now()).await
    }

    /// Forgets the stored token, caches `Anonymous` and publishes it once,
    /// then revokes the server-side session.
    ///
    /// The local transition always completes. An error from deleting the
    /// stored token or from revoking the session is returned afterwards.
    pub async fn logout_at(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        self.cache.invalidate();

        let key = self.cache.token_key();
        let token = match self.storage().get(key).await {
            Ok(token) => token.filter(|t| !t.is_blank()),
            Err(e) => {
                log::warn!(
                    target: "gatehouse",
                    "msg=\"stored token unreadable during logout\" error=\"{e}\""
                );
                None
            }
        };
        let cleared = self.storage().delete(key).await;

        self.cache.set(AuthState::Anonymous, now);
        self.cache.notify_changed(AuthState::Anonymous);

        match token {
            Some(token) => {
                LogoutAction::new(self.sessions(), &self.events)
                    .execute(token.expose_secret(), now)
                    .await?;
            }
            None => {
                self.events
                    .dispatch(AuthEvent::LoggedOut {
                        user_id: None,
                        at: now,
                    })
                    .await;
            }
        }

        cleared.map_err(|e| {
            log::error!(
                target: "gatehouse",
                "msg=\"failed to delete stored token\" error=\"{e}\""
            );
            AuthError::from(e)
        })
    }

    /// Resolves the current state, from the cache while it is fresh.
    pub async fn get_authentication_state(&self) -> AuthState {
        self.cache.get_state(Utc::now()).await
    }

    pub async fn get_authentication_state_at(&self, now: DateTime<Utc>) -> AuthState {
        self.cache.get_state(now).await
    }

    /// Reads the last cached state without resolving. False when nothing was
    /// resolved yet.
    pub fn is_authenticated(&self) -> bool {
        self.cache
            .cached()
            .is_some_and(|state| state.is_authenticated())
    }

    /// True if the last cached state is authenticated with any of `roles`.
    pub fn has_role(&self, roles: &[&str]) -> bool {
        self.cache
            .cached()
            .is_some_and(|state| state.has_any_role(roles))
    }

    pub fn current_user(&self) -> Option<Principal> {
        self.cache
            .cached()
            .and_then(|state| state.principal().cloned())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthState> {
        self.cache.subscribe()
    }

    /// Deletes sessions that expired before now.
    pub async fn prune_expired_sessions(&self) -> Result<u64, AuthError> {
        PruneExpiredSessionsAction::new(self.sessions())
            .execute(Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::storage::MockTokenStorage;
    use crate::{MockSessionRepository, MockUserRepository, StoreError, TokenStorageError, ADMIN_ROLE};

    type TestService = AuthService<MockUserRepository, MockSessionRepository, MockTokenStorage>;

    fn service() -> TestService {
        AuthService::new(
            MockUserRepository::new(),
            MockSessionRepository::new(),
            MockTokenStorage::new(),
            AuthConfig::default(),
        )
        .with_hasher(Argon2Hasher::new(1024, 1, 1))
    }

    async fn registered() -> (TestService, User) {
        let auth = service();
        let user = auth
            .register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
            .await
            .unwrap();
        (auth, user)
    }

    struct Names(Arc<Mutex<Vec<&'static str>>>);

    #[async_trait]
    impl Listener for Names {
        async fn handle(&self, event: &AuthEvent) {
            self.0.lock().unwrap().push(event.name());
        }
    }

    #[tokio::test]
    async fn test_login_stores_token_and_caches_state() {
        let (auth, user) = registered().await;

        let response = auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();

        assert_eq!(
            auth.storage().peek("token"),
            Some(response.session.token.clone())
        );
        assert!(auth.is_authenticated());
        assert_eq!(auth.current_user().unwrap().user_id, user.id);
    }

    #[tokio::test]
    async fn test_login_failure_leaves_state_alone() {
        let (auth, _) = registered().await;

        let err = auth.login("a@x.com", &SecretString::new("nope")).await.unwrap_err();

        assert_eq!(err, AuthError::InvalidCredentials);
        assert!(!auth.is_authenticated());
        assert!(auth.storage().peek("token").is_none());
    }

    #[tokio::test]
    async fn test_state_is_served_from_cache_after_login() {
        let (auth, _) = registered().await;
        auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();
        let calls = auth.sessions().call_count() + auth.users().call_count();

        assert!(auth.get_authentication_state().await.is_authenticated());
        assert!(auth.get_authentication_state().await.is_authenticated());
        assert_eq!(auth.sessions().call_count() + auth.users().call_count(), calls);
    }

    #[tokio::test]
    async fn test_login_and_logout_publish_once_each() {
        let (auth, _) = registered().await;
        let mut rx = auth.subscribe();

        auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();
        assert!(rx.try_recv().unwrap().is_authenticated());
        assert!(rx.try_recv().is_err());

        auth.logout().await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), AuthState::Anonymous);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_logout_revokes_and_clears() {
        let (auth, user) = registered().await;
        let response = auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();
        let token = response.session.token.expose_secret().to_owned();

        auth.logout().await.unwrap();

        assert!(!auth.is_authenticated());
        assert!(auth.storage().peek("token").is_none());
        assert!(!auth
            .sessions()
            .is_valid_session(&token, user.id, Utc::now())
            .await
            .unwrap());
        assert_eq!(auth.get_authentication_state().await, AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_logout_without_token() {
        let auth = service();

        auth.logout().await.unwrap();

        assert_eq!(auth.cache().cached(), Some(AuthState::Anonymous));
    }

    #[tokio::test]
    async fn test_logout_completes_locally_when_revoke_fails() {
        let (auth, _) = registered().await;
        auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();
        let mut rx = auth.subscribe();
        auth.sessions()
            .fail_with(Some(StoreError::database("revoke_session", "database is locked")));

        assert!(auth.logout().await.is_err());

        assert!(!auth.is_authenticated());
        assert!(auth.storage().peek("token").is_none());
        assert_eq!(rx.try_recv().unwrap(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_logout_with_unreadable_token() {
        let (auth, _) = registered().await;
        auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();
        auth.storage().fail_get_with(Some(TokenStorageError::Unprotect));

        auth.logout().await.unwrap();

        assert!(!auth.is_authenticated());
        assert!(auth.storage().peek("token").is_none());
    }

    #[tokio::test]
    async fn test_expired_session_resolves_anonymous() {
        let (auth, _) = registered().await;
        let now = Utc::now();
        let response = auth
            .login_at("a@x.com", &SecretString::new("p1"), now)
            .await
            .unwrap();

        let later = response.session.valid_until + Duration::seconds(1);
        assert_eq!(
            auth.get_authentication_state_at(later).await,
            AuthState::Anonymous
        );
        assert!(!auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_has_role() {
        let (auth, user) = registered().await;
        auth.users().assign_role(user.id, ADMIN_ROLE).await.unwrap();

        assert!(!auth.has_role(&[ADMIN_ROLE]));
        auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();

        assert!(auth.has_role(&[ADMIN_ROLE]));
        assert!(auth.has_role(&["Editor", ADMIN_ROLE]));
        assert!(!auth.has_role(&["Editor"]));
    }

    #[tokio::test]
    async fn test_events_reach_listeners() {
        let names = Arc::new(Mutex::new(vec![]));
        let auth = service().with_listener(Names(names.clone()));

        auth.register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
            .await
            .unwrap();
        let _ = auth.login("a@x.com", &SecretString::new("bad")).await;
        auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();
        auth.logout().await.unwrap();
        auth.storage().seed("token", "forged");
        auth.cache().invalidate();
        assert_eq!(auth.get_authentication_state().await, AuthState::Anonymous);

        assert_eq!(
            *names.lock().unwrap(),
            vec![
                "user.registered",
                "auth.login.failed",
                "auth.login.success",
                "auth.logout.success",
                "auth.session.rejected",
            ]
        );
    }
}
