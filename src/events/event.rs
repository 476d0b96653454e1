use chrono::{DateTime, Utc};

/// Why a stored token did not resolve to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// No session carries the token: never issued, or revoked.
    UnknownToken,
    Expired,
    /// The session is valid but its user no longer exists.
    UserMissing,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownToken => "unknown_token",
            Self::Expired => "expired",
            Self::UserMissing => "user_missing",
        }
    }
}

/// Authentication events emitted by the service and the state cache.
///
/// Dispatched to the listeners registered on the owning
/// [`EventDispatcher`](super::EventDispatcher); with none registered they
/// are dropped.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    UserRegistered {
        user_id: i64,
        email: String,
        at: DateTime<Utc>,
    },

    LoginSucceeded {
        user_id: i64,
        email: String,
        at: DateTime<Utc>,
    },
    /// Carries no reason: unknown email and wrong password are not told apart.
    LoginFailed {
        email: String,
        at: DateTime<Utc>,
    },
    LoggedOut {
        /// `None` when no token was stored.
        user_id: Option<i64>,
        at: DateTime<Utc>,
    },

    /// A stored token was presented but did not resolve to a user.
    SessionRejected {
        user_id: Option<i64>,
        reason: RejectionReason,
        at: DateTime<Utc>,
    },
}

impl AuthEvent {
    /// Dot-separated event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserRegistered { .. } => "user.registered",
            Self::LoginSucceeded { .. } => "auth.login.success",
            Self::LoginFailed { .. } => "auth.login.failed",
            Self::LoggedOut { .. } => "auth.logout.success",
            Self::SessionRejected { .. } => "auth.session.rejected",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::UserRegistered { at, .. }
            | Self::LoginSucceeded { at, .. }
            | Self::LoginFailed { at, .. }
            | Self::LoggedOut { at, .. }
            | Self::SessionRejected { at, .. } => *at,
        }
    }
}
