//! Bridge wire protocol: the message envelope and typed payload schemas.

pub mod envelope;
pub mod payloads;

pub use envelope::{decode_inbound, BridgeMessage, ProtocolError, PING, PONG, PROTOCOL_VERSION};
pub use payloads::{
    AlarmTriggered, AppEvent, AppPayload, HostCommand, NodeSelected, PayloadError, StateChanged,
    Theme,
};
