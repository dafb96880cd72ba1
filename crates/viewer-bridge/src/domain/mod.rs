//! Domain layer for viewer-bridge.
//!
//! Plain configuration and settings types with no I/O, no async runtime, and
//! no knowledge of where values are stored.

pub mod config;
pub mod settings;

pub use config::BridgeConfig;
pub use settings::{ModuleSettings, SettingKey, SettingKind};
