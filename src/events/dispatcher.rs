use std::sync::{Arc, RwLock};

use super::{AuthEvent, Listener};

/// Delivers events to registered listeners.
///
/// Clones share one listener list, so the service and its state cache can
/// hold the same dispatcher. With no listeners, dispatching is a no-op.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Arc<RwLock<Vec<Arc<dyn Listener>>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listeners are called in the order they are registered.
    pub fn listen(&self, listener: impl Listener) -> &Self {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(Arc::new(listener)),
            Err(_) => log::error!(
                target: "gatehouse::events",
                "msg=\"listener registry poisoned, listener dropped\""
            ),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn dispatch(&self, event: AuthEvent) {
        for listener in self.snapshot() {
            listener.handle(&event).await;
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Listener>> {
        self.listeners
            .read()
            .map(|listeners| listeners.clone())
            .unwrap_or_default()
    }
}
