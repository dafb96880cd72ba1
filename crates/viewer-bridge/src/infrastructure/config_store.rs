//! Key/value configuration port and its in-memory adapter.
//!
//! Reads are synchronous because the bridge consults the store on every
//! inbound message.  Writes are async so that adapters backed by a file or a
//! remote host API can persist without blocking the caller.

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;
use viewer_core::trust::{parse_allowlist, TrustPolicy, DEFAULT_ALLOWLIST};

use crate::domain::settings::{ModuleSettings, SettingKey, SettingKind};

/// Error type for configuration reads, writes, and persistence.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A boolean was requested from a string setting, or vice versa.
    #[error("setting \"{key}\" is not a {expected:?} setting")]
    TypeMismatch {
        key: SettingKey,
        expected: SettingKind,
    },

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized to TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Host configuration as seen by the bridge and the viewer session.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Reads a boolean setting.
    fn get_bool(&self, key: SettingKey) -> Result<bool, ConfigError>;

    /// Reads a string setting.
    fn get_string(&self, key: SettingKey) -> Result<String, ConfigError>;

    /// Writes a boolean setting.
    async fn set_bool(&self, key: SettingKey, value: bool) -> Result<(), ConfigError>;

    /// Writes a string setting.
    async fn set_string(&self, key: SettingKey, value: &str) -> Result<(), ConfigError>;
}

// ── Shared read/write helpers ─────────────────────────────────────────────────

pub(crate) fn read_bool(settings: &ModuleSettings, key: SettingKey) -> Result<bool, ConfigError> {
    settings.get_bool(key).ok_or(ConfigError::TypeMismatch {
        key,
        expected: SettingKind::Bool,
    })
}

pub(crate) fn read_string(
    settings: &ModuleSettings,
    key: SettingKey,
) -> Result<String, ConfigError> {
    settings
        .get_string(key)
        .map(str::to_string)
        .ok_or(ConfigError::TypeMismatch {
            key,
            expected: SettingKind::String,
        })
}

pub(crate) fn write_bool(
    settings: &mut ModuleSettings,
    key: SettingKey,
    value: bool,
) -> Result<(), ConfigError> {
    if settings.set_bool(key, value) {
        Ok(())
    } else {
        Err(ConfigError::TypeMismatch {
            key,
            expected: SettingKind::Bool,
        })
    }
}

pub(crate) fn write_string(
    settings: &mut ModuleSettings,
    key: SettingKey,
    value: &str,
) -> Result<(), ConfigError> {
    if settings.set_string(key, value) {
        Ok(())
    } else {
        Err(ConfigError::TypeMismatch {
            key,
            expected: SettingKind::String,
        })
    }
}

// ── Derived reads ─────────────────────────────────────────────────────────────

/// Builds the trust policy currently in effect.
///
/// A failed allowlist read falls back to the built-in allowlist; a failed
/// override read counts as "override off".  An allowlist setting that is
/// present but blank yields an empty allowlist, which trusts nothing.
pub fn trust_policy<S: ConfigStore + ?Sized>(store: &S) -> TrustPolicy {
    let allowlist = match store.get_string(SettingKey::HostAllowlist) {
        Ok(raw) => parse_allowlist(&raw),
        Err(e) => {
            warn!("reading host allowlist failed, using built-in default: {e}");
            DEFAULT_ALLOWLIST.iter().map(|h| h.to_string()).collect()
        }
    };

    let allow_any_host = store
        .get_bool(SettingKey::AllowAnyHost)
        .unwrap_or_else(|e| {
            warn!("reading allow-any-host override failed, treating as off: {e}");
            false
        });

    TrustPolicy::new(allowlist, allow_any_host)
}

/// Whether the bridge is administratively enabled.  A failed read disables it.
pub fn bridge_enabled<S: ConfigStore + ?Sized>(store: &S) -> bool {
    store.get_bool(SettingKey::EnableBridge).unwrap_or_else(|e| {
        warn!("reading bridge enable flag failed, treating bridge as disabled: {e}");
        false
    })
}

// ── In-memory adapter ─────────────────────────────────────────────────────────

/// A [`ConfigStore`] that keeps settings in memory only.
///
/// Used by tests and by hosts that persist settings themselves.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    settings: RwLock<ModuleSettings>,
}

impl MemoryConfigStore {
    pub fn new(settings: ModuleSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// A copy of the current settings.
    pub fn snapshot(&self) -> ModuleSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    fn get_bool(&self, key: SettingKey) -> Result<bool, ConfigError> {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        read_bool(&settings, key)
    }

    fn get_string(&self, key: SettingKey) -> Result<String, ConfigError> {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        read_string(&settings, key)
    }

    async fn set_bool(&self, key: SettingKey, value: bool) -> Result<(), ConfigError> {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        write_bool(&mut settings, key, value)
    }

    async fn set_string(&self, key: SettingKey, value: &str) -> Result<(), ConfigError> {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        write_string(&mut settings, key, value)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A store whose every read fails, to exercise the fallbacks.
    struct BrokenStore;

    #[async_trait]
    impl ConfigStore for BrokenStore {
        fn get_bool(&self, key: SettingKey) -> Result<bool, ConfigError> {
            Err(ConfigError::TypeMismatch {
                key,
                expected: SettingKind::Bool,
            })
        }

        fn get_string(&self, key: SettingKey) -> Result<String, ConfigError> {
            Err(ConfigError::TypeMismatch {
                key,
                expected: SettingKind::String,
            })
        }

        async fn set_bool(&self, _key: SettingKey, _value: bool) -> Result<(), ConfigError> {
            Ok(())
        }

        async fn set_string(&self, _key: SettingKey, _value: &str) -> Result<(), ConfigError> {
            Ok(())
        }
    }

    #[test]
    fn test_trust_policy_reads_allowlist_and_override() {
        // Arrange
        let store = MemoryConfigStore::new(ModuleSettings {
            host_allowlist: "a.com, b.com".to_string(),
            allow_any_host: true,
            ..ModuleSettings::default()
        });

        // Act
        let policy = trust_policy(&store);

        // Assert
        assert_eq!(policy.allowlist(), &["a.com".to_string(), "b.com".to_string()]);
        assert!(policy.allows_any_host());
    }

    #[test]
    fn test_trust_policy_falls_back_when_reads_fail() {
        let policy = trust_policy(&BrokenStore);
        assert_eq!(policy, TrustPolicy::default());
    }

    #[test]
    fn test_blank_allowlist_setting_trusts_nothing() {
        let store = MemoryConfigStore::new(ModuleSettings {
            host_allowlist: " , ".to_string(),
            ..ModuleSettings::default()
        });
        let policy = trust_policy(&store);
        assert!(policy.allowlist().is_empty());
        assert!(!policy.authorizes_host("starfinderencounters.com"));
    }

    #[test]
    fn test_bridge_enabled_defaults_true_and_fails_closed() {
        assert!(bridge_enabled(&MemoryConfigStore::default()));
        assert!(!bridge_enabled(&BrokenStore));
    }

    #[test]
    fn test_get_with_wrong_kind_is_type_mismatch() {
        let store = MemoryConfigStore::default();
        let err = store.get_bool(SettingKey::HostAllowlist).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TypeMismatch {
                key: SettingKey::HostAllowlist,
                expected: SettingKind::Bool
            }
        ));
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        // Arrange
        let store = MemoryConfigStore::default();

        // Act
        store.set_bool(SettingKey::EnableBridge, false).await.unwrap();
        store
            .set_string(SettingKey::HostAllowlist, "example.com")
            .await
            .unwrap();

        // Assert
        assert!(!store.get_bool(SettingKey::EnableBridge).unwrap());
        assert_eq!(store.get_string(SettingKey::HostAllowlist).unwrap(), "example.com");
        assert_eq!(store.snapshot().host_allowlist, "example.com");
    }

    #[tokio::test]
    async fn test_set_with_wrong_kind_is_rejected() {
        let store = MemoryConfigStore::default();
        let result = store.set_string(SettingKey::AllowAnyHost, "true").await;
        assert!(matches!(result, Err(ConfigError::TypeMismatch { .. })));
    }
}
