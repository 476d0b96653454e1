use async_trait::async_trait;

use super::AuthEvent;

/// Handles authentication events.
///
/// ```rust,ignore
/// use gatehouse::events::{AuthEvent, Listener};
/// use async_trait::async_trait;
///
/// struct LockoutAlert;
///
/// #[async_trait]
/// impl Listener for LockoutAlert {
///     async fn handle(&self, event: &AuthEvent) {
///         if let AuthEvent::LoginFailed { email, .. } = event {
///             // count failures per email
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Called for every dispatched event, in registration order.
    async fn handle(&self, event: &AuthEvent);
}
