use chrono::{DateTime, Utc};

use crate::{AuthError, SessionRepository};

/// Outcome of checking a presented token against the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// No session carries this token: never issued, or revoked.
    Unknown,
    /// The session exists but `valid_until` has passed.
    Expired { user_id: i64 },
    Valid { user_id: i64 },
}

impl TokenStatus {
    pub fn user_id(self) -> Option<i64> {
        match self {
            Self::Valid { user_id } => Some(user_id),
            Self::Unknown | Self::Expired { .. } => None,
        }
    }
}

/// Resolves bearer tokens to user ids.
///
/// Stateless; it only sequences two store calls. Existence is checked before
/// validity so callers can tell a token that never existed from one that
/// simply expired.
#[derive(Clone)]
pub struct SessionValidator<S: SessionRepository> {
    sessions: S,
}

impl<S: SessionRepository> SessionValidator<S> {
    pub fn new(sessions: S) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "check_token", skip_all, err)
    )]
    pub async fn check(&self, token: &str, now: DateTime<Utc>) -> Result<TokenStatus, AuthError> {
        let Some(user_id) = self.sessions.get_user_id_by_token(token).await? else {
            log::debug!(target: "gatehouse::validator", "msg=\"token unknown\"");
            return Ok(TokenStatus::Unknown);
        };

        if !self.sessions.is_valid_session(token, user_id, now).await? {
            log::debug!(
                target: "gatehouse::validator",
                "msg=\"session expired\" user_id={user_id}"
            );
            return Ok(TokenStatus::Expired { user_id });
        }

        Ok(TokenStatus::Valid { user_id })
    }

    /// The owning user id if the token maps to an unexpired session.
    pub async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Option<i64>, AuthError> {
        Ok(self.check(token, now).await?.user_id())
    }
}
