//! # Event Bus System
//!
//! A broadcast channel for typed core events, built on `tokio::sync::broadcast`.
//!
//! Adapter sessions publish [`AuthEvent`]s as their token lifecycle moves
//! through validation, refresh, and invalidation. Hosts subscribe to drive
//! UI state (e.g., re-prompting for login when a session invalidates) — this
//! is the generalized "prepare listener": instead of one callback holder,
//! any number of subscribers observe the same transitions.
//!
//! ## Error Handling
//!
//! `tokio::sync::broadcast` produces two receive errors:
//!
//! - **`RecvError::Lagged(n)`**: subscriber was too slow and missed `n`
//!   events. Non-fatal; the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: all senders dropped; treat as shutdown.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::events::{EventBus, CoreEvent, AuthEvent};
//!
//! let bus = EventBus::new(100);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Auth(AuthEvent::Validated {
//!     provider: "box".to_string(),
//!     user_id: "u-1".to_string(),
//! })).ok();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication / token lifecycle events
    Auth(AuthEvent),
}

/// Token-lifecycle notifications emitted by adapter sessions.
///
/// `provider` carries the provider tag (`ProviderKind::as_str`), never a
/// token value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    /// Validation request ("who am I") in flight
    Validating { provider: String },
    /// Validation succeeded; the session holds a usable token
    Validated { provider: String, user_id: String },
    /// Access token being exchanged for a fresh one
    TokenRefreshing { provider: String },
    /// Refresh completed and the new token was persisted
    TokenRefreshed { provider: String },
    /// Session became unusable; re-authentication is required
    Invalidated { provider: String, reason: String },
    /// Account was signed out and the local record removed
    SignedOut { provider: String },
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthEvent::Validating { provider } => write!(f, "{}: validating", provider),
            AuthEvent::Validated { provider, user_id } => {
                write!(f, "{}: validated as {}", provider, user_id)
            }
            AuthEvent::TokenRefreshing { provider } => write!(f, "{}: refreshing token", provider),
            AuthEvent::TokenRefreshed { provider } => write!(f, "{}: token refreshed", provider),
            AuthEvent::Invalidated { provider, reason } => {
                write!(f, "{}: invalidated ({})", provider, reason)
            }
            AuthEvent::SignedOut { provider } => write!(f, "{}: signed out", provider),
        }
    }
}

/// Central broadcast bus for core events.
///
/// Cloning the bus is cheap and all clones share the same channel. The bus
/// is fully thread-safe and can be shared across tasks with `Arc` or by
/// cloning.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received the event. An error
    /// means there were no subscribers, which is not a failure for emitters —
    /// callers typically `.ok()` the result.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Create a new subscription to this bus.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        let event = CoreEvent::Auth(AuthEvent::Validating {
            provider: "dropbox".to_string(),
        });
        bus.emit(event.clone()).unwrap();

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let event = CoreEvent::Auth(AuthEvent::SignedOut {
            provider: "box".to_string(),
        });
        bus.emit(event.clone()).unwrap();

        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(8);
        let result = bus.emit(CoreEvent::Auth(AuthEvent::TokenRefreshing {
            provider: "yandex_disk".to_string(),
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_subscriber_count() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_auth_event_serialization() {
        let event = AuthEvent::Validated {
            provider: "onedrive".to_string(),
            user_id: "user-1".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: AuthEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_auth_event_display_has_no_token_material() {
        let event = AuthEvent::TokenRefreshed {
            provider: "clouddrive".to_string(),
        };
        let rendered = event.to_string();
        assert!(rendered.contains("clouddrive"));
        assert!(!rendered.to_lowercase().contains("bearer"));
    }
}
