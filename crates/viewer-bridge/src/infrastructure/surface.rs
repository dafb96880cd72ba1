//! The embedding surface and its message target.
//!
//! An [`EmbeddingSurface`] is the host-side frame that displays the embedded
//! application.  It may or may not currently expose a live content context
//! (a [`MessageTarget`]) to post messages into; a frame that is still
//! loading, or has been torn down, has none.
//!
//! Inbound traffic arrives as [`InboundEvent`]s: the sender's origin string
//! plus the raw JSON data, exactly as the host's message listener saw them.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use viewer_core::BridgeMessage;

/// Restriction on which origin may receive an outbound message.
///
/// Outbound messages are never restricted; only inbound origins are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOrigin {
    /// Deliver regardless of the receiving document's origin (`"*"`).
    Any,
}

impl TargetOrigin {
    pub fn as_str(&self) -> &str {
        match self {
            TargetOrigin::Any => "*",
        }
    }
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to hand a message to the embedded application.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("message target is closed")]
    Closed,
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// A live content context that accepts posted messages.
#[cfg_attr(test, mockall::automock)]
pub trait MessageTarget: Send + Sync {
    fn post_message(
        &self,
        message: &BridgeMessage,
        target_origin: &TargetOrigin,
    ) -> Result<(), DeliveryError>;
}

/// The host frame displaying the embedded application.
pub trait EmbeddingSurface: Send + Sync {
    /// Navigates the frame to `url`.
    fn set_source(&self, url: &str);

    /// The URL the frame currently shows.
    fn source(&self) -> String;

    /// The frame's live content context, if it has one right now.
    fn content_target(&self) -> Option<Arc<dyn MessageTarget>>;
}

/// A message as delivered to the host's inbound listener.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Origin of the sending document, e.g. `"https://starfinderencounters.com"`.
    pub origin: String,
    /// The raw posted data.  Not yet checked for shape.
    pub data: Value,
}

impl InboundEvent {
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

// ── In-process adapter ────────────────────────────────────────────────────────

/// A [`MessageTarget`] that forwards posted messages into an mpsc channel.
#[derive(Debug)]
pub struct ChannelTarget {
    tx: mpsc::UnboundedSender<BridgeMessage>,
}

impl MessageTarget for ChannelTarget {
    fn post_message(
        &self,
        message: &BridgeMessage,
        _target_origin: &TargetOrigin,
    ) -> Result<(), DeliveryError> {
        self.tx
            .send(message.clone())
            .map_err(|_| DeliveryError::Closed)
    }
}

/// An in-process [`EmbeddingSurface`].
///
/// Outbound messages are delivered to the receiver returned by
/// [`ChannelSurface::new`].  Used by the CLI and by tests in place of a real
/// browser frame.
pub struct ChannelSurface {
    source: Mutex<String>,
    target: Option<Arc<ChannelTarget>>,
}

impl ChannelSurface {
    /// Creates a surface with a live content context.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BridgeMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let surface = Self {
            source: Mutex::new(String::new()),
            target: Some(Arc::new(ChannelTarget { tx })),
        };
        (surface, rx)
    }

    /// Creates a surface that has no content context, like a frame whose
    /// document has not loaded.
    pub fn without_content() -> Self {
        Self {
            source: Mutex::new(String::new()),
            target: None,
        }
    }
}

impl fmt::Debug for ChannelSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSurface")
            .field("source", &self.source())
            .field("has_content", &self.target.is_some())
            .finish()
    }
}

impl EmbeddingSurface for ChannelSurface {
    fn set_source(&self, url: &str) {
        *self.source.lock().unwrap_or_else(PoisonError::into_inner) = url.to_string();
    }

    fn source(&self) -> String {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn content_target(&self) -> Option<Arc<dyn MessageTarget>> {
        self.target
            .clone()
            .map(|target| target as Arc<dyn MessageTarget>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_origin_any_is_wildcard() {
        assert_eq!(TargetOrigin::Any.as_str(), "*");
        assert_eq!(TargetOrigin::Any.to_string(), "*");
    }

    #[test]
    fn test_channel_surface_delivers_posted_messages() {
        // Arrange
        let (surface, mut rx) = ChannelSurface::new();
        let target = surface.content_target().unwrap();

        // Act
        target
            .post_message(&BridgeMessage::ping(), &TargetOrigin::Any)
            .unwrap();

        // Assert
        assert_eq!(rx.try_recv().unwrap(), BridgeMessage::ping());
    }

    #[test]
    fn test_post_after_receiver_dropped_is_closed() {
        let (surface, rx) = ChannelSurface::new();
        drop(rx);
        let result = surface
            .content_target()
            .unwrap()
            .post_message(&BridgeMessage::ping(), &TargetOrigin::Any);
        assert!(matches!(result, Err(DeliveryError::Closed)));
    }

    #[test]
    fn test_surface_without_content_has_no_target() {
        let surface = ChannelSurface::without_content();
        assert!(surface.content_target().is_none());
    }

    #[test]
    fn test_set_source_is_observable() {
        let surface = ChannelSurface::without_content();
        surface.set_source("about:blank");
        assert_eq!(surface.source(), "about:blank");
    }
}
