//! User-visible notifications.
//!
//! Default handlers and the viewer session report things the user should
//! see (a selected node, an alarm, a rejected URL) through [`NotificationSink`].
//! A host integration routes these to its toast/notification UI.  The
//! [`TracingNotifier`] adapter writes them to the `notifications` tracing
//! target instead, which is what the CLI uses.

use tracing::{error, info, warn};

/// Sink for user-visible notifications, by severity.
pub trait NotificationSink: Send + Sync {
    fn info(&self, text: &str);
    fn warn(&self, text: &str);
    fn error(&self, text: &str);
}

/// Emits notifications as `tracing` events under the `notifications` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn info(&self, text: &str) {
        info!(target: "notifications", "{text}");
    }

    fn warn(&self, text: &str) {
        warn!(target: "notifications", "{text}");
    }

    fn error(&self, text: &str) {
        error!(target: "notifications", "{text}");
    }
}
