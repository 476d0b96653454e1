use async_trait::async_trait;

use crate::events::{AuthEvent, Listener};

/// Writes every event to the `log` facade under `gatehouse::events`.
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    /// Logs at INFO.
    pub fn new() -> Self {
        Self {
            level: log::Level::Info,
        }
    }

    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for LoggingListener {
    async fn handle(&self, event: &AuthEvent) {
        match event {
            AuthEvent::UserRegistered { user_id, .. } | AuthEvent::LoginSucceeded { user_id, .. } => {
                log::log!(
                    target: "gatehouse::events",
                    self.level,
                    "event={} user_id={user_id}",
                    event.name()
                );
            }
            AuthEvent::LoginFailed { .. } => {
                log::log!(target: "gatehouse::events", self.level, "event={}", event.name());
            }
            AuthEvent::LoggedOut { user_id, .. } => {
                log::log!(
                    target: "gatehouse::events",
                    self.level,
                    "event={} user_id={user_id:?}",
                    event.name()
                );
            }
            AuthEvent::SessionRejected { user_id, reason, .. } => {
                log::log!(
                    target: "gatehouse::events",
                    self.level,
                    "event={} user_id={user_id:?} reason={}",
                    event.name(),
                    reason.as_str()
                );
            }
        }
    }
}
