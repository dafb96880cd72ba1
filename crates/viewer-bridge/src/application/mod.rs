//! Application layer for viewer-bridge.
//!
//! # Sub-modules
//!
//! - **`bridge`** – The [`MessagingBridge`]: surface ownership, handshake,
//!   origin-checked inbound dispatch and outbound sends.  This runs on every
//!   message crossing the frame boundary.
//!
//! - **`handlers`** – Ordered handler registry with per-handler
//!   registrations and failure reports.
//!
//! - **`default_handlers`** – Notifications for node selection and alarms.
//!
//! - **`viewer_session`** – The viewer window's state (current URL, load
//!   state, last error) and the actions that change it.
//!
//! Everything here depends on port traits only; adapters are chosen by the
//! caller.

pub mod bridge;
pub mod default_handlers;
pub mod handlers;
pub mod viewer_session;

pub use bridge::{Disposition, MessagingBridge};
pub use default_handlers::install_default_handlers;
pub use handlers::{HandlerError, HandlerFailure, HandlerId, HandlerRegistration};
pub use viewer_session::{DiagnosticsInfo, ShareNotice, ViewerContext, ViewerSession, ViewerState};
