use async_trait::async_trait;

use crate::events::{AuthEvent, Listener};

/// Emits every event as a `tracing` event. Requires the `tracing` feature.
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &AuthEvent) {
        match event {
            AuthEvent::SessionRejected { user_id, reason, .. } => tracing::warn!(
                target: "gatehouse::events",
                event_name = event.name(),
                ?user_id,
                reason = reason.as_str(),
                "session rejected"
            ),
            _ => tracing::info!(
                target: "gatehouse::events",
                event_name = event.name(),
                at = %event.timestamp(),
                "auth event"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn test_tracing_listener_handle() {
        TracingListener
            .handle(&AuthEvent::LoginSucceeded {
                user_id: 1,
                email: "a@x.com".to_owned(),
                at: Utc::now(),
            })
            .await;
    }
}
