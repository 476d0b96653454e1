use chrono::{DateTime, Utc};

use crate::events::{AuthEvent, EventDispatcher};
use crate::{AuthError, SessionRepository};

/// Revokes the server-side session behind a token.
pub struct LogoutAction<'a, S: SessionRepository> {
    sessions: &'a S,
    events: &'a EventDispatcher,
}

impl<'a, S: SessionRepository> LogoutAction<'a, S> {
    pub fn new(sessions: &'a S, events: &'a EventDispatcher) -> Self {
        Self { sessions, events }
    }

    /// Returns the id of the user who owned the session, if it existed.
    /// Revoking an unknown token succeeds.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "logout", skip_all, err)
    )]
    pub async fn execute(&self, token: &str, now: DateTime<Utc>) -> Result<Option<i64>, AuthError> {
        let user_id = self.sessions.get_user_id_by_token(token).await?;
        self.sessions.revoke_session(token).await?;

        self.events
            .dispatch(AuthEvent::LoggedOut { user_id, at: now })
            .await;

        log::info!(target: "gatehouse", "msg=\"logout success\" user_id={user_id:?}");

        Ok(user_id)
    }
}
