//! Host-wide event broadcast.
//!
//! Every inbound message the bridge accepts is re-published to other host
//! components under a single event name.  [`ChannelBroadcaster`] implements
//! this on a `tokio::sync::broadcast` channel: subscribers that fall behind
//! lose the oldest events rather than slowing the bridge down.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

/// Publishes named events to the rest of the host.
pub trait EventBroadcaster: Send + Sync {
    /// Fire-and-forget publish.  Must not block.
    fn broadcast(&self, event: &str, payload: &Value);
}

/// One published event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastEvent {
    pub name: String,
    pub payload: Value,
}

/// [`EventBroadcaster`] over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<BroadcastEvent>,
}

impl ChannelBroadcaster {
    /// Creates a broadcaster that buffers up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventBroadcaster for ChannelBroadcaster {
    fn broadcast(&self, event: &str, payload: &Value) {
        let published = BroadcastEvent {
            name: event.to_string(),
            payload: payload.clone(),
        };
        // No subscribers is not an error for a fire-and-forget publish.
        if self.tx.send(published).is_err() {
            trace!("broadcast of {event} had no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_subscriber_receives_published_event() {
        // Arrange
        let broadcaster = ChannelBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        // Act
        broadcaster.broadcast("viewer.bridgeMessage", &json!({"type": "custom"}));

        // Assert
        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, "viewer.bridgeMessage");
        assert_eq!(event.payload, json!({"type": "custom"}));
    }

    #[test]
    fn test_publish_without_subscribers_does_not_panic() {
        let broadcaster = ChannelBroadcaster::default();
        broadcaster.broadcast("viewer.bridgeMessage", &Value::Null);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let broadcaster = ChannelBroadcaster::new(0);
        let mut rx = broadcaster.subscribe();
        broadcaster.broadcast("e", &Value::Bool(true));
        assert_eq!(rx.try_recv().unwrap().payload, Value::Bool(true));
    }
}
