//! ViewerSession: state of the single viewer window.
//!
//! Tracks which URL is shown, whether the frame finished loading, and the
//! last error.  Loading a URL validates it first; only a valid URL reaches
//! the surface and the bridge.
//!
//! ```text
//!  load_url(ok) ──► source set, not loaded ──handle_load──► loaded
//!        │                    ▲                                │
//!        │                    └────────── reload ◄─────────────┤
//!        ▼                                                     ▼
//!  load_url(bad): last_error, notify            handle_error: last_error
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, warn};
use viewer_core::trust::{format_session_display, validate, ValidationResult};

use crate::application::bridge::MessagingBridge;
use crate::domain::settings::SettingKey;
use crate::infrastructure::config_store::{trust_policy, ConfigError, ConfigStore};
use crate::infrastructure::notifier::NotificationSink;
use crate::infrastructure::surface::EmbeddingSurface;

/// Source assigned to a surface when the viewer is cleared.
pub const BLANK_SOURCE: &str = "about:blank";

/// Observable viewer state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerState {
    pub current_url: String,
    pub surface_loaded: bool,
    pub last_error: Option<String>,
}

/// Snapshot shown in the viewer's diagnostics panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsInfo {
    pub module_version: String,
    /// The current URL, or `"(none)"`.
    pub current_url: String,
    pub surface_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub bridge_connected: bool,
}

/// Everything the viewer window needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerContext {
    pub is_gm: bool,
    /// The URL the viewer would show, before validation.
    pub current_url: String,
    /// What to load into the frame; empty unless the URL is valid.
    pub surface_source: String,
    pub host_display: String,
    pub session_display: String,
    pub has_url: bool,
    pub url_error: Option<String>,
    pub surface_loaded: bool,
    pub last_error: Option<String>,
    pub show_diagnostics: bool,
    pub diagnostics: DiagnosticsInfo,
    pub bridge_connected: bool,
}

/// Summary of a URL shared with the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareNotice {
    pub url: String,
    pub host: String,
    /// Shortened session id, empty when the URL carries none.
    pub session_display: String,
}

#[derive(Default)]
struct SessionState {
    view: ViewerState,
    surface: Option<Arc<dyn EmbeddingSurface>>,
}

/// The viewer window's state and actions.
pub struct ViewerSession {
    bridge: MessagingBridge,
    settings: Arc<dyn ConfigStore>,
    notifier: Arc<dyn NotificationSink>,
    state: Mutex<SessionState>,
}

impl ViewerSession {
    pub fn new(
        bridge: MessagingBridge,
        settings: Arc<dyn ConfigStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            bridge,
            settings,
            notifier,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bridge(&self) -> &MessagingBridge {
        &self.bridge
    }

    pub fn state(&self) -> ViewerState {
        self.lock().view.clone()
    }

    fn validate(&self, url: &str) -> ValidationResult {
        validate(url, &trust_policy(&*self.settings))
    }

    /// Records a URL typed by the user without loading it.
    pub fn handle_url_change(&self, url: &str) {
        let mut state = self.lock();
        state.view = ViewerState {
            current_url: url.to_string(),
            ..ViewerState::default()
        };
        info!("URL changed: {url}");
    }

    /// Validates `url` and, if valid, shows it on `surface`.
    ///
    /// An invalid URL is recorded as the last error and reported through
    /// the notifier.  A valid URL becomes the current URL; if a surface is
    /// given it is navigated and attached to the bridge.
    pub fn load_url(&self, url: &str, surface: Option<Arc<dyn EmbeddingSurface>>) -> bool {
        let validation = self.validate(url);

        if !validation.valid {
            let message = validation
                .error_message()
                .unwrap_or_else(|| "Invalid URL".to_string());
            self.lock().view.last_error = Some(message.clone());
            self.notifier.error(&message);
            return false;
        }

        {
            let mut state = self.lock();
            state.view = ViewerState {
                current_url: validation.normalized.clone(),
                ..ViewerState::default()
            };
            state.surface = surface.clone();
        }

        if let Some(surface) = surface {
            surface.set_source(&validation.normalized);
            self.bridge.attach_surface(Some(surface));
        }

        info!("loading URL: {}", validation.normalized);
        true
    }

    /// The frame finished loading.
    pub fn handle_load(&self) {
        let mut state = self.lock();
        state.view.surface_loaded = true;
        state.view.last_error = None;
        info!("surface loaded");
    }

    /// The frame failed to load.
    pub fn handle_error(&self, error: &str) {
        let mut state = self.lock();
        state.view.surface_loaded = false;
        state.view.last_error = Some(error.to_string());
        warn!("surface error: {error}");
    }

    /// Reloads the frame in place.  No-op without a surface.
    pub fn reload(&self) {
        let surface = {
            let mut state = self.lock();
            let Some(surface) = state.surface.clone() else {
                return;
            };
            state.view.surface_loaded = false;
            state.view.last_error = None;
            surface
        };
        surface.set_source(&surface.source());
        info!("surface reloaded");
    }

    /// Blanks the frame and detaches it from the bridge.
    ///
    /// The surface itself is kept, so a later [`load_url`](Self::load_url)
    /// or [`reload`](Self::reload) can reuse it.
    pub fn clear_url(&self) {
        let surface = {
            let mut state = self.lock();
            state.view = ViewerState::default();
            state.surface.clone()
        };
        if let Some(surface) = surface {
            surface.set_source(BLANK_SOURCE);
        }
        self.bridge.attach_surface(None);
        info!("URL cleared");
    }

    /// Replaces the session's surface and attaches it to the bridge.
    pub fn set_surface(&self, surface: Option<Arc<dyn EmbeddingSurface>>) {
        self.lock().surface = surface.clone();
        self.bridge.attach_surface(surface);
    }

    /// Picks the URL to open: explicit, then current, then the world
    /// default, then (for players only) the URL last shared by the GM.
    ///
    /// Returns an empty string when none is set.
    pub fn resolve_url(&self, explicit: Option<&str>, is_gm: bool) -> String {
        if let Some(url) = explicit.filter(|u| !u.is_empty()) {
            return url.to_string();
        }

        let current = self.lock().view.current_url.clone();
        if !current.is_empty() {
            return current;
        }

        let world = self.read_string(SettingKey::DefaultUrl);
        if !world.is_empty() || is_gm {
            return world;
        }

        self.read_string(SettingKey::CurrentSharedUrl)
    }

    fn read_string(&self, key: SettingKey) -> String {
        self.settings.get_string(key).unwrap_or_else(|e| {
            warn!("reading {key} failed: {e}");
            String::new()
        })
    }

    /// Everything needed to render the viewer for `explicit`/`is_gm`.
    pub fn context(&self, explicit: Option<&str>, is_gm: bool) -> ViewerContext {
        let url = self.resolve_url(explicit, is_gm);
        let validation = (!url.is_empty()).then(|| self.validate(&url));
        let view = self.state();
        let valid = validation.as_ref().is_some_and(|v| v.valid);

        ViewerContext {
            is_gm,
            surface_source: match &validation {
                Some(v) if v.valid => v.normalized.clone(),
                _ => String::new(),
            },
            host_display: validation
                .as_ref()
                .map(|v| v.host.clone())
                .unwrap_or_default(),
            session_display: validation
                .as_ref()
                .and_then(|v| v.session_id.as_deref())
                .map(format_session_display)
                .unwrap_or_default(),
            has_url: valid,
            url_error: validation.as_ref().and_then(ValidationResult::error_message),
            surface_loaded: view.surface_loaded,
            last_error: view.last_error,
            show_diagnostics: self
                .settings
                .get_bool(SettingKey::DiagnosticsMode)
                .unwrap_or(false),
            diagnostics: self.diagnostics(),
            bridge_connected: self.bridge.is_connected(),
            current_url: url,
        }
    }

    pub fn diagnostics(&self) -> DiagnosticsInfo {
        let view = self.state();
        DiagnosticsInfo {
            module_version: env!("CARGO_PKG_VERSION").to_string(),
            current_url: if view.current_url.is_empty() {
                "(none)".to_string()
            } else {
                view.current_url
            },
            surface_loaded: view.surface_loaded,
            last_error: view.last_error,
            bridge_connected: self.bridge.is_connected(),
        }
    }

    /// Stores the current URL as the world default.
    ///
    /// Returns `Ok(false)` (after a warning notification) when there is no
    /// current URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the setting could not be written.
    pub async fn save_to_world(&self) -> Result<bool, ConfigError> {
        let url = self.state().current_url;
        if url.is_empty() {
            self.notifier.warn("No URL to save");
            return Ok(false);
        }

        self.settings.set_string(SettingKey::DefaultUrl, &url).await?;
        self.notifier.info("Saved as world default");
        Ok(true)
    }

    /// Shares `url` with the table.
    ///
    /// An invalid URL is reported through the notifier and `Ok(None)` is
    /// returned.  When `is_gm`, the normalized URL is stored as the shared
    /// URL players fall back to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the shared URL could not be written.
    pub async fn share_url(&self, url: &str, is_gm: bool) -> Result<Option<ShareNotice>, ConfigError> {
        let validation = self.validate(url);
        if !validation.valid {
            let message = validation
                .error_message()
                .unwrap_or_else(|| "Invalid URL".to_string());
            self.notifier.error(&message);
            return Ok(None);
        }

        if is_gm {
            self.settings
                .set_string(SettingKey::CurrentSharedUrl, &validation.normalized)
                .await?;
        }

        info!("shared URL: {}", validation.normalized);
        self.notifier.info("Hacking network shared");
        Ok(Some(ShareNotice {
            session_display: validation
                .session_id
                .as_deref()
                .map(format_session_display)
                .unwrap_or_default(),
            host: validation.host,
            url: validation.normalized,
        }))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
