//! Authentication events and state-change notification.
//!
//! Two channels leave the library:
//!
//! - [`AuthEvent`]s (registration, login, logout, rejected sessions) go to
//!   the [`Listener`]s registered on an [`EventDispatcher`]. Use them for
//!   audit logs and metrics.
//! - [`AuthState`](crate::AuthState) changes go out through a
//!   [`StateNotifier`] broadcast channel, for UI layers that re-render when
//!   the user logs in or out.
//!
//! ```rust,ignore
//! use gatehouse::events::listeners::LoggingListener;
//!
//! let service = AuthService::new(users, sessions, storage, config)
//!     .with_listener(LoggingListener::new());
//! let mut changes = service.subscribe();
//! ```

mod dispatcher;
mod event;
mod listener;
mod notifier;

pub mod listeners;

pub use dispatcher::EventDispatcher;
pub use event::{AuthEvent, RejectionReason};
pub use listener::Listener;
pub use notifier::StateNotifier;
