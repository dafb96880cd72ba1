//! TOML-file backed [`ConfigStore`].
//!
//! The whole [`ModuleSettings`] document lives in one file.  Reads are served
//! from an in-memory copy; every write updates the copy and then rewrites the
//! file.  A missing file loads as defaults, so the store works on first run
//! and the file appears on the first write.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::settings::{ModuleSettings, SettingKey};
use crate::infrastructure::config_store::{
    read_bool, read_string, write_bool, write_string, ConfigError, ConfigStore,
};

/// Loads `ModuleSettings` from `path`, returning defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_settings(path: &Path) -> Result<ModuleSettings, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ModuleSettings::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Settings persisted in a TOML file.
#[derive(Debug)]
pub struct TomlConfigStore {
    path: PathBuf,
    settings: RwLock<ModuleSettings>,
}

impl TomlConfigStore {
    /// Opens the store at `path`, reading the file if it exists.
    ///
    /// # Errors
    ///
    /// See [`load_settings`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let settings = load_settings(&path)?;
        debug!("loaded settings from {}", path.display());
        Ok(Self {
            path,
            settings: RwLock::new(settings),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current settings.
    pub fn snapshot(&self) -> ModuleSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Writes `content` to the backing file, creating parent directories.
    async fn persist(&self, content: String) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ConfigError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!("saved settings to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for TomlConfigStore {
    fn get_bool(&self, key: SettingKey) -> Result<bool, ConfigError> {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        read_bool(&settings, key)
    }

    fn get_string(&self, key: SettingKey) -> Result<String, ConfigError> {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        read_string(&settings, key)
    }

    async fn set_bool(&self, key: SettingKey, value: bool) -> Result<(), ConfigError> {
        let content = {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            write_bool(&mut settings, key, value)?;
            toml::to_string_pretty(&*settings)?
        };
        self.persist(content).await
    }

    async fn set_string(&self, key: SettingKey, value: &str) -> Result<(), ConfigError> {
        let content = {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            write_string(&mut settings, key, value)?;
            toml::to_string_pretty(&*settings)?
        };
        self.persist(content).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
