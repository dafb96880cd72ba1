//! # viewer-core
//!
//! Shared library for the hacking network viewer containing the URL trust
//! validator and the cross-context bridge wire protocol.
//!
//! This crate is used by `viewer-bridge` and by any host integration that
//! needs to check a URL before embedding it.  It has zero dependencies on
//! async runtimes, UI frameworks, or I/O.
//!
//! # Architecture overview
//!
//! A host application (a tabletop simulation platform) embeds an external web
//! application inside a frame and exchanges JSON messages with it.  Two
//! questions sit at the trust boundary:
//!
//! - **`trust`** – Is a user-supplied URL well formed, and does its host belong
//!   to the configured allowlist?  The same host rule is reused by the bridge
//!   to authorise the origin of every inbound message.
//!
//! - **`protocol`** – What does a message look like on the wire?  Every
//!   message is a JSON object `{"type", "version", "payload"}`.  Inbound JSON
//!   is shape-checked at the boundary and known payloads are decoded into
//!   typed structs instead of being trusted blindly.
//!
//! - **`domain`** – Small value types shared by the bridge and its callers
//!   (connection state, surface generations).

pub mod domain;
pub mod protocol;
pub mod trust;

// Re-export the most-used types at the crate root so callers can write
// `viewer_core::validate` instead of `viewer_core::trust::validator::validate`.
pub use domain::{ConnectionState, SurfaceGeneration};
pub use protocol::envelope::{decode_inbound, BridgeMessage, ProtocolError, PROTOCOL_VERSION};
pub use protocol::payloads::{AppEvent, AppPayload, HostCommand, PayloadError};
pub use trust::policy::TrustPolicy;
pub use trust::validator::{format_session_display, validate, UrlIssue, ValidationResult};
