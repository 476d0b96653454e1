use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::AuthState;

/// Broadcasts authentication state changes to subscribers.
///
/// Publishing never waits on receivers. A receiver that falls more than
/// `capacity` states behind gets [`broadcast::error::RecvError::Lagged`]
/// and resumes at the oldest retained state.
pub struct StateNotifier {
    sender: broadcast::Sender<AuthState>,
    last_published: Mutex<AuthState>,
}

impl StateNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            last_published: Mutex::new(AuthState::Anonymous),
        }
    }

    /// Sends `state` to every current subscriber and returns how many there
    /// were. Having none is not an error.
    pub fn publish(&self, state: AuthState) -> usize {
        if let Ok(mut last) = self.last_published.lock() {
            *last = state.clone();
        }
        match self.sender.send(state) {
            Ok(receivers) => receivers,
            Err(_) => {
                log::trace!(target: "gatehouse::state", "msg=\"state published with no subscribers\"");
                0
            }
        }
    }

    /// Publishes only when `state` differs from the last published one.
    pub fn publish_if_changed(&self, state: &AuthState) -> Option<usize> {
        if self.last_published() == *state {
            return None;
        }
        Some(self.publish(state.clone()))
    }

    /// Starts as `Anonymous` before anything was published.
    pub fn last_published(&self) -> AuthState {
        self.last_published
            .lock()
            .map(|last| last.clone())
            .unwrap_or(AuthState::Anonymous)
    }

    /// States published before this call are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthState> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
