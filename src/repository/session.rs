use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};

use crate::{AuthError, SecretString};

/// A login session as returned by [`SessionRepository::create_session`].
///
/// `token` is the bearer value handed to the client. Stores only keep its
/// digest, so sessions are never read back with the token filled in.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token: SecretString,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl Session {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until > now
    }
}

/// A session that has not been persisted yet.
///
/// Both stamps are truncated to whole milliseconds, the precision every
/// store keeps, so expiry compares the same way in memory and on disk.
/// Construction enforces `valid_until > created_at`.
#[derive(Debug, Clone)]
pub struct NewSession {
    user_id: i64,
    token: SecretString,
    created_at: DateTime<Utc>,
    valid_until: DateTime<Utc>,
}

impl NewSession {
    /// # Errors
    ///
    /// `AuthError::InvalidSessionLifetime` when `lifetime` is not positive.
    pub fn new(
        user_id: i64,
        token: SecretString,
        created_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<Self, AuthError> {
        if lifetime <= Duration::zero() {
            return Err(AuthError::InvalidSessionLifetime);
        }
        let created_at = truncate_to_millis(created_at)?;
        let valid_until = created_at
            .checked_add_signed(lifetime)
            .ok_or(AuthError::InvalidSessionLifetime)
            .and_then(truncate_to_millis)?;
        if valid_until <= created_at {
            return Err(AuthError::InvalidSessionLifetime);
        }

        Ok(Self {
            user_id,
            token,
            created_at,
            valid_until,
        })
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn valid_until(&self) -> DateTime<Utc> {
        self.valid_until
    }

    pub(crate) fn into_session(self, id: i64) -> Session {
        Session {
            id,
            user_id: self.user_id,
            token: self.token,
            created_at: self.created_at,
            valid_until: self.valid_until,
        }
    }
}

fn truncate_to_millis(at: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
    at.duration_trunc(Duration::milliseconds(1))
        .map_err(|_| AuthError::InvalidSessionLifetime)
}

/// Server-side session records.
///
/// Expiry is decided at read time by comparing `valid_until` with the `now`
/// the caller passes in; implementations must bind that value rather than
/// reading their own clock.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// # Errors
    ///
    /// `StoreError::UniqueViolation` when the token is already in use.
    async fn create_session(&self, session: NewSession) -> Result<Session, AuthError>;

    /// True iff a session with this token belongs to `user_id` and
    /// `valid_until > now`.
    async fn is_valid_session(
        &self,
        token: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError>;

    /// Owner of the token, expired or not.
    async fn get_user_id_by_token(&self, token: &str) -> Result<Option<i64>, AuthError>;

    /// Deletes the session for this token, if any.
    async fn revoke_session(&self, token: &str) -> Result<(), AuthError>;

    /// Deletes sessions with `valid_until <= now`. Returns how many were removed.
    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}
