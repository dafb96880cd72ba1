//! Domain value types shared by the bridge and its callers.

use std::fmt;

use serde::Serialize;

/// Liveness of the bridge towards the embedded application.
///
/// ```text
///                  pong while a surface is attached
///   Disconnected ─────────────────────────────────────▶ Connected
///        ▲                                                  │
///        └────────── surface attached / detached / teardown ┘
/// ```
///
/// There is no timeout-driven transition back to `Disconnected`: a silent
/// application simply stops producing pongs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

/// Identifies one attachment of an embedding surface.
///
/// Every attach (or detach) bumps the generation.  A deferred task captures
/// the generation it was scheduled for and compares it on wake-up, so work
/// meant for a superseded surface is skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceGeneration(u64);

impl SurfaceGeneration {
    /// The generation after this one.  Wraps at `u64::MAX`.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_defaults_to_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!(!ConnectionState::default().is_connected());
    }

    #[test]
    fn test_generation_increments_and_wraps() {
        let first = SurfaceGeneration::default();
        assert_eq!(first.next().get(), 1);
        assert_eq!(SurfaceGeneration(u64::MAX).next().get(), 0);
    }

    #[test]
    fn test_generation_display() {
        assert_eq!(SurfaceGeneration::default().next().to_string(), "gen-1");
    }
}
