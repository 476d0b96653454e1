//! Run periodically to delete expired sessions. Validity never depends on
//! it; expired rows simply stop validating.

use chrono::{DateTime, Utc};

use crate::{AuthError, SessionRepository};

pub struct PruneExpiredSessionsAction<'a, S: SessionRepository> {
    sessions: &'a S,
}

impl<'a, S: SessionRepository> PruneExpiredSessionsAction<'a, S> {
    pub fn new(sessions: &'a S) -> Self {
        Self { sessions }
    }

    /// Returns how many sessions were deleted.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self), name = "prune_expired")
    )]
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let pruned = self.sessions.prune_expired(now).await?;

        log::info!(target: "gatehouse", "msg=\"sessions pruned\" count={pruned}");

        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{MockSessionRepository, NewSession, SecretString};

    #[tokio::test]
    async fn test_prune_removes_only_expired() {
        let sessions = MockSessionRepository::new();
        let now = Utc::now();
        for (token, created) in [("old", now - Duration::days(2)), ("new", now)] {
            sessions
                .create_session(
                    NewSession::new(1, SecretString::new(token), created, Duration::days(1))
                        .unwrap(),
                )
                .await
                .unwrap();
        }

        let pruned = PruneExpiredSessionsAction::new(&sessions)
            .execute(now)
            .await
            .unwrap();

        assert_eq!(pruned, 1);
        assert_eq!(sessions.get_user_id_by_token("new").await.unwrap(), Some(1));
        assert_eq!(sessions.get_user_id_by_token("old").await.unwrap(), None);
    }
}
