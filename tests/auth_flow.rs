//! Full register / login / resolve / logout flows over the in-memory stores.
//!
//! Run with: `cargo test --features mocks --test auth_flow`

#![cfg(feature = "mocks")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use gatehouse::crypto::Argon2Hasher;
use gatehouse::crypto::PasswordHasher;
use gatehouse::storage::{InMemoryTokenStorage, MockTokenStorage, ProtectedTokenStorage};
use gatehouse::{
    AuthConfig, AuthError, AuthService, AuthState, MockSessionRepository, MockUserRepository,
    NewUser, SecretString, SessionRepository, UserRepository,
};

type Service = AuthService<MockUserRepository, MockSessionRepository, MockTokenStorage>;

fn service_with(config: AuthConfig) -> Service {
    AuthService::new(
        MockUserRepository::new(),
        MockSessionRepository::new(),
        MockTokenStorage::new(),
        config,
    )
    .with_hasher(Argon2Hasher::new(1024, 1, 1))
}

#[tokio::test]
async fn test_register_login_expire_scenario() {
    let auth = service_with(AuthConfig::default());
    let alice = NewUser::new("a@x.com", "alice");

    let user = auth
        .register(&alice, &SecretString::new("p1"))
        .await
        .unwrap();

    let err = auth
        .register(&alice, &SecretString::new("p1"))
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::DuplicateEmail);

    let err = auth
        .login("a@x.com", &SecretString::new("wrong"))
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::InvalidCredentials);

    let now = Utc::now();
    let response = auth
        .login_at("a@x.com", &SecretString::new("p1"), now)
        .await
        .unwrap();
    let token = response.session.token.expose_secret().to_owned();
    assert_eq!(token.len(), 50);
    assert_eq!(response.session.user_id, user.id);
    assert_eq!(
        response.session.valid_until,
        response.session.created_at + Duration::days(7)
    );
    assert_eq!(response.session.created_at.timestamp_millis(), now.timestamp_millis());

    assert!(auth
        .sessions()
        .is_valid_session(&token, user.id, now)
        .await
        .unwrap());

    let after = response.session.valid_until;
    assert!(!auth
        .sessions()
        .is_valid_session(&token, user.id, after)
        .await
        .unwrap());
    assert_eq!(
        auth.get_authentication_state_at(after).await,
        AuthState::Anonymous
    );
}

#[tokio::test]
async fn test_registered_credentials_authorize() {
    let auth = service_with(AuthConfig::default());
    let hasher = Argon2Hasher::new(1024, 1, 1);
    let user = auth
        .register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
        .await
        .unwrap();

    let found = auth
        .users()
        .authorize_by_credentials("a@x.com", &SecretString::new("p1"), &hasher)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);
    assert_eq!(found.email, "a@x.com");

    let rejected = auth
        .users()
        .authorize_by_credentials("a@x.com", &SecretString::new("p2"), &hasher)
        .await
        .unwrap();
    assert!(rejected.is_none());
    assert!(hasher.verify("p1", &found.hashed_password).unwrap());
}

#[tokio::test]
async fn test_two_reads_within_ttl_hit_stores_once() {
    let auth = service_with(AuthConfig::default());
    auth.register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
        .await
        .unwrap();
    let now = Utc::now();
    auth.login_at("a@x.com", &SecretString::new("p1"), now)
        .await
        .unwrap();
    auth.cache().invalidate();

    let before = auth.sessions().call_count() + auth.users().call_count();
    let first = auth.get_authentication_state_at(now).await;
    let middle = auth.sessions().call_count() + auth.users().call_count();
    let second = auth
        .get_authentication_state_at(now + Duration::minutes(1))
        .await;
    let after = auth.sessions().call_count() + auth.users().call_count();

    assert!(first.is_authenticated());
    assert_eq!(first, second);
    assert!(middle > before);
    assert_eq!(after, middle);
}

#[tokio::test]
async fn test_each_transition_notifies_once() {
    let auth = service_with(AuthConfig::default());
    let mut rx = auth.subscribe();
    auth.register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
        .await
        .unwrap();
    assert!(rx.try_recv().is_err());

    auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();
    let state = rx.recv().await.unwrap();
    assert_eq!(state.principal().unwrap().email, "a@x.com");
    assert!(rx.try_recv().is_err());

    auth.logout().await.unwrap();
    assert_eq!(rx.recv().await.unwrap(), AuthState::Anonymous);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_state_read_overlapping_login_ends_authenticated() {
    let auth = service_with(AuthConfig::default());
    auth.register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
        .await
        .unwrap();
    let mut rx = auth.subscribe();
    let now = Utc::now();

    auth.storage().hold_next_get();
    let login = async {
        auth.storage().held().await;
        let response = auth
            .login_at("a@x.com", &SecretString::new("p1"), now)
            .await
            .unwrap();
        auth.storage().release();
        response
    };
    let (state, response) = tokio::join!(auth.get_authentication_state_at(now), login);

    assert_eq!(state.principal().unwrap().user_id, response.user.id);
    assert_eq!(auth.cache().cached(), Some(state.clone()));
    assert_eq!(rx.try_recv().unwrap(), state);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_state_read_overlapping_logout_ends_anonymous() {
    let auth = service_with(AuthConfig::default());
    auth.register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
        .await
        .unwrap();
    let now = Utc::now();
    auth.login_at("a@x.com", &SecretString::new("p1"), now)
        .await
        .unwrap();
    auth.cache().invalidate();
    let mut rx = auth.subscribe();

    auth.storage().hold_next_get();
    let logout = async {
        auth.storage().held().await;
        auth.logout_at(now).await.unwrap();
        auth.storage().release();
    };
    let (state, ()) = tokio::join!(auth.get_authentication_state_at(now), logout);

    assert_eq!(state, AuthState::Anonymous);
    assert_eq!(auth.cache().cached(), Some(AuthState::Anonymous));
    assert_eq!(rx.try_recv().unwrap(), AuthState::Anonymous);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_dropped_login_leaves_client_logged_out() {
    let auth = service_with(AuthConfig::default());
    auth.register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
        .await
        .unwrap();
    let mut rx = auth.subscribe();

    auth.storage().hold_next_set();
    let password = SecretString::new("p1");
    tokio::select! {
        _ = auth.login("a@x.com", &password) => panic!("held login completed"),
        () = auth.storage().held() => {}
    }

    assert_eq!(auth.cache().cached(), None);
    assert!(auth.storage().peek(auth.cache().token_key()).is_none());
    assert!(!auth.is_authenticated());
    assert!(rx.try_recv().is_err());
    assert_eq!(
        auth.get_authentication_state().await,
        AuthState::Anonymous
    );

    auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();
    assert!(auth.is_authenticated());
    assert!(rx.try_recv().unwrap().is_authenticated());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_restored_token_resolves_in_new_service() {
    let users = MockUserRepository::new();
    let sessions = MockSessionRepository::new();
    let storage = MockTokenStorage::new();
    let hasher = Argon2Hasher::new(1024, 1, 1);

    let first = AuthService::new(
        users.clone(),
        sessions.clone(),
        storage.clone(),
        AuthConfig::default(),
    )
    .with_hasher(hasher.clone());
    first
        .register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
        .await
        .unwrap();
    first.login("a@x.com", &SecretString::new("p1")).await.unwrap();

    let second = AuthService::new(users, sessions, storage, AuthConfig::default())
        .with_hasher(hasher);
    let mut rx = second.subscribe();
    assert!(!second.is_authenticated());

    let state = second.get_authentication_state().await;
    assert!(state.is_authenticated());
    assert!(second.is_authenticated());
    assert_eq!(rx.try_recv().unwrap(), state);
}

#[tokio::test]
async fn test_rotated_protection_key_logs_out() {
    let users = MockUserRepository::new();
    let sessions = MockSessionRepository::new();
    let backend = InMemoryTokenStorage::new();
    let key_one = SecretString::new("first-protection-key-that-is-long-enough");
    let key_two = SecretString::new("second-protection-key-that-is-long-enough");

    let first = AuthService::new(
        users.clone(),
        sessions.clone(),
        ProtectedTokenStorage::new(backend.clone(), key_one).unwrap(),
        AuthConfig::default(),
    )
    .with_hasher(Argon2Hasher::new(1024, 1, 1));
    first
        .register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
        .await
        .unwrap();
    first.login("a@x.com", &SecretString::new("p1")).await.unwrap();
    assert_eq!(backend.len(), 1);

    let rotated = AuthService::new(
        users,
        sessions,
        ProtectedTokenStorage::new(backend.clone(), key_two).unwrap(),
        AuthConfig::default(),
    );

    assert_eq!(
        rotated.get_authentication_state().await,
        AuthState::Anonymous
    );
    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_concurrent_state_reads_share_one_resolution() {
    let auth = Arc::new(service_with(AuthConfig::default()));
    auth.register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
        .await
        .unwrap();
    auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();
    auth.cache().invalidate();
    let gets_before = auth.storage().get_count();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.get_authentication_state().await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_authenticated());
    }

    assert_eq!(auth.storage().get_count() - gets_before, 1);
}

#[tokio::test]
async fn test_prune_expired_sessions() {
    let config = AuthConfig {
        session_lifetime: Duration::minutes(1),
        ..AuthConfig::default()
    };
    let auth = service_with(config);
    auth.register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1"))
        .await
        .unwrap();
    auth.login_at(
        "a@x.com",
        &SecretString::new("p1"),
        Utc::now() - Duration::minutes(5),
    )
    .await
    .unwrap();
    auth.login("a@x.com", &SecretString::new("p1")).await.unwrap();

    assert_eq!(auth.prune_expired_sessions().await.unwrap(), 1);
    assert_eq!(auth.sessions().len(), 1);
}
