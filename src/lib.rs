//! Session-based authentication.
//!
//! Users register with an email and password. Logging in opens a
//! server-side session and hands the client an opaque bearer token, which
//! the library keeps in a [`TokenStorage`](storage::TokenStorage). Every
//! state query resolves that token back to a user through the session store,
//! with the result cached for a short TTL and state changes broadcast to
//! subscribers.
//!
//! # Components
//!
//! | Type | Role |
//! |------|------|
//! | [`UserRepository`] | Users, password checks, role claims |
//! | [`SessionRepository`] | Session records and validity checks |
//! | [`SessionValidator`] | Token to user id, only for unexpired sessions |
//! | [`AuthStateCache`] | TTL cache of the resolved [`AuthState`] |
//! | [`AuthService`] | Register, login, logout, state queries |
//!
//! # Features
//!
//! - `mocks`: in-memory stores and token storage for tests
//! - `sqlx_sqlite`: `SQLite` stores and bundled migrations
//! - `tracing`: spans on store and action methods, plus a tracing event listener
//!
//! # Example
//!
//! ```rust,ignore
//! use gatehouse::sqlite::{create_repositories, migrations};
//! use gatehouse::storage::InMemoryTokenStorage;
//! use gatehouse::{AuthConfig, AuthService, NewUser, SecretString};
//!
//! migrations::run(&pool).await?;
//! let (users, sessions) = create_repositories(pool);
//! let auth = AuthService::new(users, sessions, InMemoryTokenStorage::new(), AuthConfig::default());
//!
//! auth.register(&NewUser::new("a@x.com", "alice"), &SecretString::new("p1")).await?;
//! let response = auth.login("a@x.com", &SecretString::new("p1")).await?;
//! assert!(auth.get_authentication_state().await.is_authenticated());
//! ```

pub mod actions;
pub mod config;
pub mod crypto;
mod error;
pub mod events;
pub mod repository;
mod secret;
mod service;
pub mod state;
pub mod storage;
mod validator;
pub mod validators;

#[cfg(feature = "sqlx_sqlite")]
pub mod sqlite;

pub use actions::LoginResponse;
pub use config::AuthConfig;
pub use error::{AuthError, StoreError, TokenStorageError};
pub use repository::{
    NewSession, NewUser, Role, Session, SessionRepository, User, UserRepository, ADMIN_ROLE,
};
pub use secret::SecretString;
pub use service::AuthService;
pub use state::{AuthState, AuthStateCache, Principal};
pub use validator::{SessionValidator, TokenStatus};

#[cfg(any(test, feature = "mocks"))]
pub use repository::{MockSessionRepository, MockUserRepository, StoredSession};
