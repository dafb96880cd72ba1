//! Persisted module settings.
//!
//! [`ModuleSettings`] is the schema of the settings file.  Every field has a
//! serde default so a missing file, an empty file, or a file written by an
//! older version all load cleanly:
//!
//! ```toml
//! host_allowlist = "starfinderencounters.com, example.com"
//! allow_any_host = false
//! enable_bridge = true
//! ```
//!
//! [`SettingKey`] names each field for the key/value
//! [`ConfigStore`](crate::infrastructure::config_store::ConfigStore) port.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a setting holds a boolean or a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Bool,
    String,
}

/// Keys of the settings the bridge and viewer read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Comma-separated trusted hostnames.
    HostAllowlist,
    /// Unsafe override: trust every host.
    AllowAnyHost,
    /// URL opened when nothing more specific is set.
    DefaultUrl,
    /// Whether non-GM users may open the viewer.
    PlayersCanOpen,
    /// Whether diagnostics are shown in the viewer.
    DiagnosticsMode,
    /// Administrative on/off switch for the bridge.
    EnableBridge,
    /// URL most recently shared with players.
    CurrentSharedUrl,
    /// Fallback `tracing` filter when `RUST_LOG` is unset.
    LogLevel,
}

impl SettingKey {
    pub const ALL: [SettingKey; 8] = [
        SettingKey::HostAllowlist,
        SettingKey::AllowAnyHost,
        SettingKey::DefaultUrl,
        SettingKey::PlayersCanOpen,
        SettingKey::DiagnosticsMode,
        SettingKey::EnableBridge,
        SettingKey::CurrentSharedUrl,
        SettingKey::LogLevel,
    ];

    /// The host-side name of the setting.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::HostAllowlist => "hostAllowlist",
            SettingKey::AllowAnyHost => "allowAnyHost",
            SettingKey::DefaultUrl => "defaultUrl",
            SettingKey::PlayersCanOpen => "playersCanOpen",
            SettingKey::DiagnosticsMode => "diagnosticsMode",
            SettingKey::EnableBridge => "enableBridge",
            SettingKey::CurrentSharedUrl => "currentSharedUrl",
            SettingKey::LogLevel => "logLevel",
        }
    }

    pub fn kind(self) -> SettingKind {
        match self {
            SettingKey::AllowAnyHost
            | SettingKey::PlayersCanOpen
            | SettingKey::DiagnosticsMode
            | SettingKey::EnableBridge => SettingKind::Bool,
            SettingKey::HostAllowlist
            | SettingKey::DefaultUrl
            | SettingKey::CurrentSharedUrl
            | SettingKey::LogLevel => SettingKind::String,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema of the persisted settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleSettings {
    #[serde(default = "default_allowlist")]
    pub host_allowlist: String,
    #[serde(default)]
    pub allow_any_host: bool,
    #[serde(default)]
    pub default_url: String,
    #[serde(default = "default_true")]
    pub players_can_open: bool,
    #[serde(default)]
    pub diagnostics_mode: bool,
    #[serde(default = "default_true")]
    pub enable_bridge: bool,
    #[serde(default)]
    pub current_shared_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_allowlist() -> String {
    viewer_core::trust::DEFAULT_ALLOWLIST.join(",")
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            host_allowlist: default_allowlist(),
            allow_any_host: false,
            default_url: String::new(),
            players_can_open: default_true(),
            diagnostics_mode: false,
            enable_bridge: default_true(),
            current_shared_url: String::new(),
            log_level: default_log_level(),
        }
    }
}

impl ModuleSettings {
    /// Reads a boolean setting.  `None` if `key` holds a string.
    pub fn get_bool(&self, key: SettingKey) -> Option<bool> {
        match key {
            SettingKey::AllowAnyHost => Some(self.allow_any_host),
            SettingKey::PlayersCanOpen => Some(self.players_can_open),
            SettingKey::DiagnosticsMode => Some(self.diagnostics_mode),
            SettingKey::EnableBridge => Some(self.enable_bridge),
            _ => None,
        }
    }

    /// Reads a string setting.  `None` if `key` holds a boolean.
    pub fn get_string(&self, key: SettingKey) -> Option<&str> {
        match key {
            SettingKey::HostAllowlist => Some(&self.host_allowlist),
            SettingKey::DefaultUrl => Some(&self.default_url),
            SettingKey::CurrentSharedUrl => Some(&self.current_shared_url),
            SettingKey::LogLevel => Some(&self.log_level),
            _ => None,
        }
    }

    /// Writes a boolean setting.  Returns `false` (and changes nothing) if
    /// `key` holds a string.
    pub fn set_bool(&mut self, key: SettingKey, value: bool) -> bool {
        let slot = match key {
            SettingKey::AllowAnyHost => &mut self.allow_any_host,
            SettingKey::PlayersCanOpen => &mut self.players_can_open,
            SettingKey::DiagnosticsMode => &mut self.diagnostics_mode,
            SettingKey::EnableBridge => &mut self.enable_bridge,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Writes a string setting.  Returns `false` (and changes nothing) if
    /// `key` holds a boolean.
    pub fn set_string(&mut self, key: SettingKey, value: &str) -> bool {
        let slot = match key {
            SettingKey::HostAllowlist => &mut self.host_allowlist,
            SettingKey::DefaultUrl => &mut self.default_url,
            SettingKey::CurrentSharedUrl => &mut self.current_shared_url,
            SettingKey::LogLevel => &mut self.log_level,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
