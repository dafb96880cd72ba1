//! viewer-bridge library crate.
//!
//! This crate connects a host application (a tabletop simulation platform) to
//! the embedded hacking network viewer.  It owns the embedding surface
//! reference, authorises and dispatches inbound cross-context messages, and
//! tracks the ping/pong connection state.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Host application (settings, notifications, frame, event hooks)
//!         ↕  ports
//! [viewer-bridge]
//!   ├── domain/           BridgeConfig, persisted ModuleSettings
//!   ├── application/      MessagingBridge, handler registry, ViewerSession
//!   └── infrastructure/   Ports + adapters: config store, notifier,
//!                         broadcaster, embedding surface
//!         ↕  postMessage-style delivery
//! Embedded viewer (JSON {"type","version","payload"})
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async runtime.
//! - `application` depends on `domain`, `viewer-core`, and the port traits
//!   declared in `infrastructure`, never on a concrete adapter.
//! - `infrastructure` holds the port traits and their adapters (TOML file,
//!   `tracing`, tokio broadcast channel).

/// Domain layer: configuration and settings types (no I/O).
pub mod domain;

/// Application layer: the bridge state machine and the viewer session.
pub mod application;

/// Infrastructure layer: collaborator ports and their adapters.
pub mod infrastructure;

pub use application::{MessagingBridge, ViewerSession};
pub use domain::{BridgeConfig, ModuleSettings};
