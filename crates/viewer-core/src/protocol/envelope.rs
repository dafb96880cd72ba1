//! The JSON envelope carried by every bridge message.
//!
//! # Wire shape
//!
//! ```json
//! {"type":"nodeSelected","version":1,"payload":{"nodeId":"n1","nodeName":"Core"}}
//! ```
//!
//! The shape must be preserved exactly: the embedded application is built
//! against it independently of this crate.
//!
//! # Versioning
//!
//! `version` is a plain integer, currently [`PROTOCOL_VERSION`].  It is carried
//! for future extensibility only; no negotiation happens and a mismatch is
//! never rejected.
//!
//! # Reserved types
//!
//! `"ping"` (host → app) and `"pong"` (app → host) form the connection
//! handshake.  Every other `type` is application-defined.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Current bridge protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Handshake request type (host → app).
pub const PING: &str = "ping";

/// Handshake reply type (app → host).
pub const PONG: &str = "pong";

/// A message travelling in either direction across the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeMessage {
    /// Message type; routes the message to handlers.
    #[serde(rename = "type")]
    pub kind: String,

    /// Protocol version the sender speaks.
    pub version: u32,

    /// Type-specific data.  Opaque to the envelope.
    #[serde(default)]
    pub payload: Value,
}

impl BridgeMessage {
    /// Creates a message at the current protocol version.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            version: PROTOCOL_VERSION,
            payload,
        }
    }

    /// The handshake request: `{"type":"ping","version":1,"payload":{}}`.
    pub fn ping() -> Self {
        Self::new(PING, json!({}))
    }

    /// The handshake reply: `{"type":"pong","version":1,"payload":{}}`.
    pub fn pong() -> Self {
        Self::new(PONG, json!({}))
    }

    pub fn is_ping(&self) -> bool {
        self.kind == PING
    }

    pub fn is_pong(&self) -> bool {
        self.kind == PONG
    }

    /// The message as a JSON value, in wire shape.
    pub fn to_value(&self) -> Value {
        json!({
            "type": self.kind,
            "version": self.version,
            "payload": self.payload,
        })
    }
}

/// Inbound data that does not have the envelope shape.
///
/// Cross-context channels carry unrelated traffic from other scripts, so these
/// errors are expected background noise and callers drop such data quietly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("inbound data is not a JSON object")]
    NotAnObject,

    #[error("inbound message has no string \"type\" field")]
    MissingType,
}

/// Shape-checks inbound JSON and lifts it into a [`BridgeMessage`].
///
/// Only a string `type` is required, matching what the embedded application
/// has always been held to.  A missing or non-integer `version` is read as
/// [`PROTOCOL_VERSION`]; a missing `payload` becomes `null`.
///
/// # Errors
///
/// - [`ProtocolError::NotAnObject`] if `data` is not a JSON object.
/// - [`ProtocolError::MissingType`] if `type` is absent or not a string.
pub fn decode_inbound(data: &Value) -> Result<BridgeMessage, ProtocolError> {
    let object = data.as_object().ok_or(ProtocolError::NotAnObject)?;

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    let version = object
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(PROTOCOL_VERSION);

    let payload = object.get("payload").cloned().unwrap_or(Value::Null);

    Ok(BridgeMessage {
        kind: kind.to_string(),
        version,
        payload,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
