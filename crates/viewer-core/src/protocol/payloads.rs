//! Typed payload schemas for the known message types.
//!
//! The envelope keeps `payload` opaque.  Before a payload reaches typed code it
//! is decoded against the schema of its message type; a payload that does not
//! match is reported as a [`PayloadError`] instead of being cast blindly.
//!
//! # App → host
//!
//! | type             | payload                          |
//! |------------------|----------------------------------|
//! | `nodeSelected`   | `{"nodeId": str, "nodeName": str}` |
//! | `alarmTriggered` | `{"level": number}`              |
//! | `stateChanged`   | `{"state": str}`                 |
//! | `pong`           | `{}`                             |
//!
//! # Host → app
//!
//! | type       | payload                          |
//! |------------|----------------------------------|
//! | `setTheme` | `{"theme": "light" \| "dark"}`    |
//! | `setZoom`  | `{"zoom": number}`               |
//! | `ping`     | `{}`                             |
//!
//! These lists are illustrative: the bridge routes any other `type` untouched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::envelope::{BridgeMessage, PING, PONG};

/// A payload that failed its schema check.
#[derive(Debug, Error)]
#[error("payload of \"{kind}\" does not match its schema: {source}")]
pub struct PayloadError {
    /// The message type whose schema was applied.
    pub kind: String,
    #[source]
    pub source: serde_json::Error,
}

/// A payload struct bound to one message type.
///
/// Implementors get [`AppPayload::from_message`] for free, which is what the
/// bridge uses for typed handler registration.
pub trait AppPayload: DeserializeOwned + Send + 'static {
    /// The `type` this payload travels under.
    const TYPE: &'static str;

    /// Decodes the payload of `message` against this schema.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if the payload does not deserialize into `Self`.
    fn from_message(message: &BridgeMessage) -> Result<Self, PayloadError> {
        Self::from_payload(&message.payload)
    }

    /// Decodes a bare payload value against this schema.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if the payload does not deserialize into `Self`.
    fn from_payload(payload: &serde_json::Value) -> Result<Self, PayloadError> {
        Self::deserialize(payload).map_err(|source| PayloadError {
            kind: Self::TYPE.to_string(),
            source,
        })
    }
}

// ── App → host payloads ───────────────────────────────────────────────────────

/// The player selected a node in the network view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelected {
    pub node_id: String,
    pub node_name: String,
}

impl AppPayload for NodeSelected {
    const TYPE: &'static str = "nodeSelected";
}

/// The network raised its alarm level.
///
/// The level is any JSON number; fractional and negative levels are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmTriggered {
    pub level: f64,
}

impl AppPayload for AlarmTriggered {
    const TYPE: &'static str = "alarmTriggered";
}

/// The application moved to a new top-level state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChanged {
    pub state: String,
}

impl AppPayload for StateChanged {
    const TYPE: &'static str = "stateChanged";
}

/// A decoded message from the embedded application.
///
/// Serializes back to the `{"type", "payload"}` shape it was decoded from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum AppEvent {
    NodeSelected(NodeSelected),
    AlarmTriggered(AlarmTriggered),
    StateChanged(StateChanged),
    Pong,
}

impl AppEvent {
    /// Decodes `message` if its type is one of the known app → host types.
    ///
    /// Returns `Ok(None)` for any other type, so application-defined messages
    /// pass through untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] when the type is known but the payload does not
    /// match its schema.
    pub fn decode(message: &BridgeMessage) -> Result<Option<Self>, PayloadError> {
        let event = match message.kind.as_str() {
            NodeSelected::TYPE => Self::NodeSelected(NodeSelected::from_message(message)?),
            AlarmTriggered::TYPE => Self::AlarmTriggered(AlarmTriggered::from_message(message)?),
            StateChanged::TYPE => Self::StateChanged(StateChanged::from_message(message)?),
            PONG => Self::Pong,
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

// ── Host → app commands ───────────────────────────────────────────────────────

/// Colour scheme requested from the embedded application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// A message the host sends to the embedded application.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    SetTheme { theme: Theme },
    SetZoom { zoom: f64 },
    Ping,
}

impl HostCommand {
    /// The wire `type` of this command.
    pub fn kind(&self) -> &'static str {
        match self {
            HostCommand::SetTheme { .. } => "setTheme",
            HostCommand::SetZoom { .. } => "setZoom",
            HostCommand::Ping => PING,
        }
    }

    /// Wraps the command in an envelope at the current protocol version.
    pub fn to_message(&self) -> BridgeMessage {
        let payload = match self {
            HostCommand::SetTheme { theme } => json!({ "theme": theme }),
            HostCommand::SetZoom { zoom } => json!({ "zoom": zoom }),
            HostCommand::Ping => json!({}),
        };
        BridgeMessage::new(self.kind(), payload)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
