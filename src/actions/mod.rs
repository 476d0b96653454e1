//! Server-side steps of each authentication flow.
//!
//! Each action borrows the stores it needs and runs one operation through
//! `execute`. [`AuthService`](crate::AuthService) composes them with the
//! client-side token storage and the state cache; use them directly when
//! only the server half is needed, such as in an HTTP handler.

mod login;
mod logout;
mod prune_expired;
mod register;

pub use login::{LoginAction, LoginResponse};
pub use logout::LogoutAction;
pub use prune_expired::PruneExpiredSessionsAction;
pub use register::RegisterAction;
