//! Handler registry: message type → ordered list of handlers.
//!
//! Handlers for one type run in registration order.  Registering returns a
//! [`HandlerRegistration`] that removes exactly that handler again; IDs are
//! unique per registry, so unregistering never touches a different handler
//! that happens to wrap the same closure.
//!
//! Dispatch works on a snapshot: the registry lock is released before any
//! handler runs, so a handler may register or unregister handlers (including
//! itself) without deadlocking.  Such changes take effect from the next
//! dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use viewer_core::PayloadError;

/// A registered callback.  Receives the message payload.
pub type HandlerFn = dyn Fn(&Value) -> Result<(), HandlerError> + Send + Sync;

/// Identity of one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

/// Why a handler did not complete.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The payload did not match the schema the handler was registered for.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The handler reported its own failure.
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        HandlerError::Failed(reason.into())
    }
}

/// Report of one handler failure, published on the bridge's failure channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerFailure {
    pub message_type: String,
    pub handler: HandlerId,
    pub error: String,
}

type Entry = (HandlerId, Arc<HandlerFn>);

/// Ordered handlers keyed by message type.
#[derive(Default)]
pub struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, Vec<Entry>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Vec<Entry>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `handler` to the list for `kind`.
    pub fn register(self: &Arc<Self>, kind: &str, handler: Arc<HandlerFn>) -> HandlerRegistration {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.table()
            .entry(kind.to_string())
            .or_default()
            .push((id, handler));
        HandlerRegistration {
            registry: Arc::downgrade(self),
            kind: kind.to_string(),
            id,
        }
    }

    /// Removes the first handler for `kind` with `id`.  Returns whether one
    /// was removed.
    pub fn unregister(&self, kind: &str, id: HandlerId) -> bool {
        let mut table = self.table();
        let Some(list) = table.get_mut(kind) else {
            return false;
        };
        let Some(index) = list.iter().position(|(entry_id, _)| *entry_id == id) else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            table.remove(kind);
        }
        true
    }

    /// The handlers for `kind`, in registration order, as of now.
    pub fn snapshot(&self, kind: &str) -> Vec<Entry> {
        self.table().get(kind).cloned().unwrap_or_default()
    }

    /// Number of handlers registered for `kind`.
    pub fn count(&self, kind: &str) -> usize {
        self.table().get(kind).map_or(0, Vec::len)
    }
}

/// Handle returned by registration.  Consuming it unregisters the handler.
///
/// Dropping the handle without calling [`unregister`](Self::unregister)
/// leaves the handler registered.
#[derive(Debug)]
#[must_use = "dropping the registration keeps the handler registered forever"]
pub struct HandlerRegistration {
    registry: Weak<HandlerRegistry>,
    kind: String,
    id: HandlerId,
}

impl HandlerRegistration {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn message_type(&self) -> &str {
        &self.kind
    }

    /// Removes the handler.  Returns `false` if the registry has been dropped.
    pub fn unregister(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.unregister(&self.kind, self.id),
            None => false,
        }
    }
}
