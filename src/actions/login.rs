use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::crypto::{generate_token, PasswordHasher};
use crate::events::{AuthEvent, EventDispatcher};
use crate::{AuthError, NewSession, SecretString, Session, SessionRepository, User, UserRepository};

/// A successful login: the user and the freshly created session, whose
/// `token` is the only copy of the bearer credential.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: User,
    #[serde(skip)]
    pub session: Session,
}

pub struct LoginAction<'a, U: UserRepository, S: SessionRepository> {
    users: &'a U,
    sessions: &'a S,
    hasher: &'a dyn PasswordHasher,
    events: &'a EventDispatcher,
    session_lifetime: Duration,
    token_length: usize,
}

impl<'a, U: UserRepository, S: SessionRepository> LoginAction<'a, U, S> {
    pub fn new(
        users: &'a U,
        sessions: &'a S,
        hasher: &'a dyn PasswordHasher,
        events: &'a EventDispatcher,
        session_lifetime: Duration,
        token_length: usize,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            events,
            session_lifetime,
            token_length,
        }
    }

    /// Verifies the credentials and opens a session valid from `now` for the
    /// configured lifetime.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredentials` for an unknown email or a wrong
    ///   password; the two are indistinguishable
    /// - `AuthError::Store` if the session cannot be created
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "login", skip_all, err)
    )]
    pub async fn execute(
        &self,
        email: &str,
        password: &SecretString,
        now: DateTime<Utc>,
    ) -> Result<LoginResponse, AuthError> {
        let Some(user) = self
            .users
            .authorize_by_credentials(email, password, self.hasher)
            .await?
        else {
            self.events
                .dispatch(AuthEvent::LoginFailed {
                    email: email.to_owned(),
                    at: now,
                })
                .await;
            log::info!(target: "gatehouse", "msg=\"login failed\"");
            return Err(AuthError::InvalidCredentials);
        };

        let token = SecretString::new(generate_token(self.token_length));
        let session = NewSession::new(user.id, token, now, self.session_lifetime)?;
        let session = self.sessions.create_session(session).await?;

        self.events
            .dispatch(AuthEvent::LoginSucceeded {
                user_id: user.id,
                email: user.email.clone(),
                at: now,
            })
            .await;

        log::info!(
            target: "gatehouse",
            "msg=\"login success\" user_id={} session_id={}",
            user.id,
            session.id
        );

        Ok(LoginResponse { user, session })
    }
}
