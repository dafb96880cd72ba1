//! Infrastructure layer for viewer-bridge.
//!
//! The bridge talks to its host through four narrow ports.  Each port is a
//! trait declared here together with the adapters this crate ships:
//!
//! | Port                | Adapters                                   |
//! |---------------------|--------------------------------------------|
//! | `ConfigStore`       | `MemoryConfigStore`, `TomlConfigStore`     |
//! | `NotificationSink`  | `TracingNotifier`                          |
//! | `EventBroadcaster`  | `ChannelBroadcaster` (tokio broadcast)     |
//! | `EmbeddingSurface`  | `ChannelSurface` (tokio mpsc, in-process)  |
//!
//! A host integration replaces the adapters with its own implementations;
//! the application layer only ever sees the traits.

pub mod broadcaster;
pub mod config_store;
pub mod notifier;
pub mod surface;
pub mod toml_store;

pub use broadcaster::{BroadcastEvent, ChannelBroadcaster, EventBroadcaster};
pub use config_store::{bridge_enabled, trust_policy, ConfigError, ConfigStore, MemoryConfigStore};
pub use notifier::{NotificationSink, TracingNotifier};
pub use surface::{
    ChannelSurface, DeliveryError, EmbeddingSurface, InboundEvent, MessageTarget, TargetOrigin,
};
pub use toml_store::TomlConfigStore;
