//! Bridge runtime configuration.
//!
//! [`BridgeConfig`] holds the knobs of the bridge itself, as opposed to the
//! user-facing [`ModuleSettings`](super::ModuleSettings) that the host
//! persists.  Build it once at startup and hand it to
//! [`MessagingBridge::new`](crate::application::MessagingBridge::new).

use std::time::Duration;

/// Prefix used for host-side event names.
pub const MODULE_ID: &str = "damoritosh-hacking-viewer";

/// All runtime configuration for the messaging bridge.
///
/// # Example
///
/// ```rust
/// use viewer_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.handshake_delay.as_secs(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// How long to wait after attaching a surface before sending the
    /// handshake ping.
    ///
    /// The delay lets the newly attached document finish its own start-up.
    /// It is best effort: a slow document may still miss the ping, in which
    /// case the bridge stays disconnected until the next attach.
    pub handshake_delay: Duration,

    /// Event name under which every accepted inbound message is re-broadcast.
    pub broadcast_event: String,
}

impl Default for BridgeConfig {
    /// | Field             | Default                                     |
    /// |-------------------|---------------------------------------------|
    /// | `handshake_delay` | 1 second                                    |
    /// | `broadcast_event` | `damoritosh-hacking-viewer.bridgeMessage`   |
    fn default() -> Self {
        Self {
            handshake_delay: Duration::from_secs(1),
            broadcast_event: format!("{MODULE_ID}.bridgeMessage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_handshake_delay_is_one_second() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.handshake_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_default_broadcast_event_is_namespaced() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.broadcast_event, "damoritosh-hacking-viewer.bridgeMessage");
    }
}
