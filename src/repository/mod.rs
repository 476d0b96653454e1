//! Store traits and record types.
//!
//! | Trait | Description |
//! |-------|-------------|
//! | [`UserRepository`] | Users, credential checks, role claims |
//! | [`SessionRepository`] | Session records and validity checks |
//!
//! Enable the `mocks` feature for in-memory implementations
//! ([`MockUserRepository`], [`MockSessionRepository`]) and the `sqlx_sqlite`
//! feature for the SQLite ones in [`crate::sqlite`].

mod session;
mod user;

#[cfg(any(test, feature = "mocks"))]
mod session_mock;
#[cfg(any(test, feature = "mocks"))]
mod user_mock;

pub use session::{NewSession, Session, SessionRepository};
pub use user::{NewUser, Role, User, UserRepository, ADMIN_ROLE};

#[cfg(any(test, feature = "mocks"))]
pub use session_mock::{MockSessionRepository, StoredSession};
#[cfg(any(test, feature = "mocks"))]
pub use user_mock::MockUserRepository;
