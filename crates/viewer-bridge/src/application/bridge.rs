//! MessagingBridge: origin-checked, handler-dispatching message bridge.
//!
//! The bridge owns the single active embedding surface, listens for inbound
//! messages, and tracks whether the embedded application has answered the
//! handshake.
//!
//! # Inbound pipeline
//!
//! ```text
//! InboundEvent ─► listening? ─► enabled? ─► origin trusted? ─► envelope ok?
//!                                                                  │
//!                     ┌────────────── type == "pong" ◄─────────────┤
//!                     ▼                                            ▼
//!              mark connected                   handlers (in order, isolated)
//!                                                                  │
//!                                                                  ▼
//!                                                       broadcast raw message
//! ```
//!
//! Every early exit is silent towards the caller.  Inbound traffic on a
//! cross-context channel is full of unrelated messages, and the host event
//! loop that delivers them has no way to act on a per-message error.
//!
//! # Handshake
//!
//! Attaching a surface bumps the [`SurfaceGeneration`] and schedules a `ping`
//! after [`BridgeConfig::handshake_delay`].  The timer task is aborted on the
//! next attach, and re-checks the generation when it wakes, so a ping is
//! never sent on behalf of a surface that has since been replaced.
//!
//! # Locking
//!
//! State lives behind one `std::sync::Mutex`.  The lock is only held for
//! short reads and writes; handlers and the message target run with it
//! released, so either may call back into the bridge.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use viewer_core::protocol::Theme;
use viewer_core::{
    decode_inbound, AppPayload, BridgeMessage, ConnectionState, HostCommand, SurfaceGeneration,
};

use crate::application::handlers::{
    HandlerError, HandlerFailure, HandlerRegistration, HandlerRegistry,
};
use crate::domain::BridgeConfig;
use crate::infrastructure::broadcaster::EventBroadcaster;
use crate::infrastructure::config_store::{bridge_enabled, trust_policy, ConfigStore};
use crate::infrastructure::surface::{EmbeddingSurface, InboundEvent, TargetOrigin};

/// Buffered handler-failure reports per subscriber.
const FAILURE_CHANNEL_CAPACITY: usize = 32;

/// What [`MessagingBridge::receive`] did with an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Disposition {
    /// No inbound listener is installed (not initialised, or torn down).
    NotListening,
    /// The bridge is disabled by settings.
    Disabled,
    /// The sender's origin is not trusted.
    UnauthorizedOrigin,
    /// The data does not have the message envelope shape.
    Malformed,
    /// A handshake reply.  `connected` is the connection state afterwards.
    Pong { connected: bool },
    /// Handlers ran and the message was broadcast.
    Dispatched { handlers: usize, failed: usize },
}

#[derive(Default)]
struct BridgeState {
    listening: bool,
    surface: Option<Arc<dyn EmbeddingSurface>>,
    generation: SurfaceGeneration,
    connection: ConnectionState,
    handshake: Option<JoinHandle<()>>,
}

impl BridgeState {
    fn cancel_handshake(&mut self) {
        if let Some(task) = self.handshake.take() {
            task.abort();
        }
    }

    /// Drops the current surface and moves to a new generation.
    fn replace_surface(&mut self, surface: Option<Arc<dyn EmbeddingSurface>>) -> SurfaceGeneration {
        self.cancel_handshake();
        self.generation = self.generation.next();
        self.connection = ConnectionState::Disconnected;
        self.surface = surface;
        self.generation
    }
}

struct Inner {
    config: BridgeConfig,
    settings: Arc<dyn ConfigStore>,
    broadcaster: Arc<dyn EventBroadcaster>,
    handlers: Arc<HandlerRegistry>,
    failures: broadcast::Sender<HandlerFailure>,
    state: Mutex<BridgeState>,
}

/// The host side of the cross-context message bridge.
///
/// Cloning is cheap and every clone drives the same bridge.
#[derive(Clone)]
pub struct MessagingBridge {
    inner: Arc<Inner>,
}

impl MessagingBridge {
    pub fn new(
        config: BridgeConfig,
        settings: Arc<dyn ConfigStore>,
        broadcaster: Arc<dyn EventBroadcaster>,
    ) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                settings,
                broadcaster,
                handlers: Arc::new(HandlerRegistry::new()),
                failures,
                state: Mutex::new(BridgeState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, BridgeState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn enabled(&self) -> bool {
        bridge_enabled(&*self.inner.settings)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Installs the inbound listener if the bridge is enabled.
    ///
    /// Returns whether the bridge is now listening.  Calling `init` again
    /// after the enable flag changed picks up the new value.
    pub fn init(&self) -> bool {
        let enabled = self.enabled();
        self.state().listening = enabled;
        if enabled {
            info!("messaging bridge initialised");
        } else {
            info!("messaging bridge disabled by settings");
        }
        enabled
    }

    pub fn is_listening(&self) -> bool {
        self.state().listening
    }

    /// Removes the inbound listener, detaches the surface and resets the
    /// connection.  Registered handlers are kept.  Safe to call repeatedly.
    pub fn teardown(&self) {
        let was_listening = {
            let mut state = self.state();
            let was_listening = state.listening;
            state.listening = false;
            state.replace_surface(None);
            was_listening
        };
        if was_listening {
            info!("messaging bridge torn down");
        }
    }

    // ── Surface and handshake ─────────────────────────────────────────────────

    /// Makes `surface` the active surface, replacing any previous one.
    ///
    /// The connection resets to disconnected.  When a surface is given and
    /// the bridge is enabled, a handshake `ping` is scheduled after the
    /// configured delay on the current tokio runtime.
    pub fn attach_surface(&self, surface: Option<Arc<dyn EmbeddingSurface>>) {
        let attached = surface.is_some();
        let generation = self.state().replace_surface(surface);

        if !attached {
            info!(%generation, "surface detached");
            return;
        }
        info!(%generation, "surface attached");

        if !self.enabled() {
            debug!(%generation, "bridge disabled, no handshake scheduled");
            return;
        }
        self.schedule_handshake(generation);
    }

    fn schedule_handshake(&self, generation: SurfaceGeneration) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(%generation, "no async runtime available, handshake not scheduled");
                return;
            }
        };

        let bridge = Arc::downgrade(&self.inner);
        let delay = self.inner.config.handshake_delay;
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = bridge.upgrade() {
                MessagingBridge { inner }.fire_handshake(generation);
            }
        });

        let mut state = self.state();
        if state.generation == generation {
            state.handshake = Some(task);
        } else {
            // Superseded between spawning and storing.
            task.abort();
        }
    }

    fn fire_handshake(&self, generation: SurfaceGeneration) {
        if self.deliver(&BridgeMessage::ping(), Some(generation)) {
            debug!(%generation, "handshake ping sent");
        }
    }

    pub fn has_surface(&self) -> bool {
        self.state().surface.is_some()
    }

    pub fn generation(&self) -> SurfaceGeneration {
        self.state().generation
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state().connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    // ── Outbound ──────────────────────────────────────────────────────────────

    /// Posts `message` to the embedded application.
    ///
    /// Returns `false` when there is no surface, the surface has no live
    /// content context, the bridge is disabled, or the target refused the
    /// post.  Messages are posted with [`TargetOrigin::Any`]: only inbound
    /// traffic is origin-checked.
    pub fn send(&self, message: &BridgeMessage) -> bool {
        self.deliver(message, None)
    }

    /// Sends a typed host command.
    pub fn send_command(&self, command: &HostCommand) -> bool {
        self.send(&command.to_message())
    }

    pub fn send_theme(&self, theme: Theme) -> bool {
        self.send_command(&HostCommand::SetTheme { theme })
    }

    pub fn send_zoom(&self, zoom: f64) -> bool {
        self.send_command(&HostCommand::SetZoom { zoom })
    }

    /// Shared send path.  With `expected` set, the send only happens if that
    /// generation is still current.
    fn deliver(&self, message: &BridgeMessage, expected: Option<SurfaceGeneration>) -> bool {
        let surface = {
            let mut state = self.state();
            if let Some(expected) = expected {
                if state.generation != expected {
                    debug!(
                        stale = %expected,
                        current = %state.generation,
                        "skipping {} for a replaced surface",
                        message.kind
                    );
                    return false;
                }
                state.handshake = None;
            }
            state.surface.clone()
        };

        let Some(target) = surface.and_then(|s| s.content_target()) else {
            warn!("cannot send {} to app: no surface available", message.kind);
            return false;
        };

        if !self.enabled() {
            debug!("bridge disabled, not sending {}", message.kind);
            return false;
        }

        match target.post_message(message, &TargetOrigin::Any) {
            Ok(()) => {
                debug!("sent {} to app", message.kind);
                true
            }
            Err(e) => {
                warn!("failed to send {} to app: {e}", message.kind);
                false
            }
        }
    }

    // ── Inbound ───────────────────────────────────────────────────────────────

    /// Entry point for every inbound cross-context message.
    ///
    /// Never fails towards the caller; the returned [`Disposition`] is purely
    /// informational.
    pub fn receive(&self, event: &InboundEvent) -> Disposition {
        if !self.is_listening() {
            trace!("no listener installed, ignoring inbound message");
            return Disposition::NotListening;
        }
        if !self.enabled() {
            return Disposition::Disabled;
        }

        let policy = trust_policy(&*self.inner.settings);
        if !policy.authorizes_origin(&event.origin) {
            debug!(origin = %event.origin, "ignoring message from unauthorized origin");
            return Disposition::UnauthorizedOrigin;
        }

        let message = match decode_inbound(&event.data) {
            Ok(message) => message,
            Err(e) => {
                debug!(origin = %event.origin, "ignoring malformed message: {e}");
                return Disposition::Malformed;
            }
        };
        debug!(version = message.version, "received {} from app", message.kind);

        if message.is_pong() {
            return Disposition::Pong {
                connected: self.confirm_connection(),
            };
        }

        let (handlers, failed) = self.dispatch(&message);
        self.inner
            .broadcaster
            .broadcast(&self.inner.config.broadcast_event, &event.data);
        Disposition::Dispatched { handlers, failed }
    }

    /// Marks the connection live if a surface is attached.
    fn confirm_connection(&self) -> bool {
        let mut state = self.state();
        if state.surface.is_none() {
            debug!("pong received with no surface attached");
            return false;
        }
        if !state.connection.is_connected() {
            state.connection = ConnectionState::Connected;
            info!(generation = %state.generation, "connection to app confirmed");
        }
        true
    }

    /// Runs every handler for the message type, isolating failures.
    /// Returns `(handlers run, handlers failed)`.
    fn dispatch(&self, message: &BridgeMessage) -> (usize, usize) {
        let handlers = self.inner.handlers.snapshot(&message.kind);
        let mut failed = 0;

        for (id, handler) in &handlers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&message.payload)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(panic) => HandlerError::Panicked(panic_message(panic.as_ref())),
            };

            failed += 1;
            warn!(handler = %id, "handler for {} failed: {error}", message.kind);
            let report = HandlerFailure {
                message_type: message.kind.clone(),
                handler: *id,
                error: error.to_string(),
            };
            if self.inner.failures.send(report).is_err() {
                trace!("no handler-failure subscribers");
            }
        }

        (handlers.len(), failed)
    }

    // ── Handlers ──────────────────────────────────────────────────────────────

    /// Registers `handler` for messages of type `kind`.  It receives the raw
    /// payload.
    pub fn register_handler<F>(&self, kind: &str, handler: F) -> HandlerRegistration
    where
        F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.inner.handlers.register(kind, Arc::new(handler))
    }

    /// Registers a typed handler for `P::TYPE`.
    ///
    /// The payload is decoded against `P` first; a payload that does not
    /// match is reported as a handler failure and `handler` is not called.
    pub fn on<P, F>(&self, handler: F) -> HandlerRegistration
    where
        P: AppPayload,
        F: Fn(P) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register_handler(P::TYPE, move |payload: &Value| {
            let decoded = P::from_payload(payload)?;
            handler(decoded)
        })
    }

    pub fn handler_count(&self, kind: &str) -> usize {
        self.inner.handlers.count(kind)
    }

    /// Subscribes to reports of failed handler invocations.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<HandlerFailure> {
        self.inner.failures.subscribe()
    }
}

impl std::fmt::Debug for MessagingBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MessagingBridge")
            .field("listening", &state.listening)
            .field("has_surface", &state.surface.is_some())
            .field("generation", &state.generation)
            .field("connection", &state.connection)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
