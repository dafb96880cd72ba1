//! Handlers installed for every viewer.
//!
//! | type             | action                                    |
//! |------------------|-------------------------------------------|
//! | `nodeSelected`   | info notification `Node selected: {name}` |
//! | `alarmTriggered` | warn notification `Alarm Level: {level}`  |
//! | `stateChanged`   | debug log                                 |

use std::sync::Arc;

use tracing::debug;
use viewer_core::protocol::{AlarmTriggered, NodeSelected, StateChanged};

use crate::application::bridge::MessagingBridge;
use crate::application::handlers::HandlerRegistration;
use crate::infrastructure::notifier::NotificationSink;

/// Registers the default handlers on `bridge`.
///
/// The returned registrations can be used to remove them again.
pub fn install_default_handlers(
    bridge: &MessagingBridge,
    notifier: Arc<dyn NotificationSink>,
) -> Vec<HandlerRegistration> {
    let on_node = Arc::clone(&notifier);
    let on_alarm = notifier;

    vec![
        bridge.on(move |node: NodeSelected| {
            on_node.info(&format!("Node selected: {}", node.node_name));
            Ok(())
        }),
        bridge.on(move |alarm: AlarmTriggered| {
            on_alarm.warn(&format!("Alarm Level: {}", alarm.level));
            Ok(())
        }),
        bridge.on(|change: StateChanged| {
            debug!(state = %change.state, "app state changed");
            Ok(())
        }),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::domain::BridgeConfig;
    use crate::infrastructure::broadcaster::ChannelBroadcaster;
    use crate::infrastructure::config_store::MemoryConfigStore;
    use crate::infrastructure::surface::InboundEvent;

    #[derive(Default)]
    struct RecordingNotifier {
        lines: Mutex<Vec<(&'static str, String)>>,
    }

    impl RecordingNotifier {
        fn lines(&self) -> Vec<(&'static str, String)> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingNotifier {
        fn info(&self, text: &str) {
            self.lines.lock().unwrap().push(("info", text.to_string()));
        }
        fn warn(&self, text: &str) {
            self.lines.lock().unwrap().push(("warn", text.to_string()));
        }
        fn error(&self, text: &str) {
            self.lines.lock().unwrap().push(("error", text.to_string()));
        }
    }

    fn bridge_with_defaults() -> (MessagingBridge, Arc<RecordingNotifier>, Vec<HandlerRegistration>) {
        let bridge = MessagingBridge::new(
            BridgeConfig::default(),
            Arc::new(MemoryConfigStore::default()),
            Arc::new(ChannelBroadcaster::default()),
        );
        bridge.init();
        let notifier = Arc::new(RecordingNotifier::default());
        let registrations = install_default_handlers(&bridge, notifier.clone());
        (bridge, notifier, registrations)
    }

    fn inbound(kind: &str, payload: serde_json::Value) -> InboundEvent {
        InboundEvent::new(
            "https://starfinderencounters.com",
            json!({"type": kind, "version": 1, "payload": payload}),
        )
    }

    #[test]
    fn test_node_selected_notifies_info() {
        let (bridge, notifier, _regs) = bridge_with_defaults();

        bridge.receive(&inbound("nodeSelected", json!({"nodeId": "n1", "nodeName": "Firewall"})));

        assert_eq!(notifier.lines(), vec![("info", "Node selected: Firewall".to_string())]);
    }

    #[test]
    fn test_alarm_triggered_notifies_warn() {
        let (bridge, notifier, _regs) = bridge_with_defaults();

        bridge.receive(&inbound("alarmTriggered", json!({"level": 3})));

        assert_eq!(notifier.lines(), vec![("warn", "Alarm Level: 3".to_string())]);
    }

    #[test]
    fn test_fractional_and_negative_alarm_levels_notify() {
        let (bridge, notifier, _regs) = bridge_with_defaults();

        bridge.receive(&inbound("alarmTriggered", json!({"level": 2.5})));
        bridge.receive(&inbound("alarmTriggered", json!({"level": -1})));
        bridge.receive(&inbound("alarmTriggered", json!({"level": 2.0})));

        assert_eq!(
            notifier.lines(),
            vec![
                ("warn", "Alarm Level: 2.5".to_string()),
                ("warn", "Alarm Level: -1".to_string()),
                ("warn", "Alarm Level: 2".to_string()),
            ]
        );
    }

    #[test]
    fn test_state_changed_does_not_notify() {
        let (bridge, notifier, _regs) = bridge_with_defaults();
        bridge.receive(&inbound("stateChanged", json!({"state": "breach"})));
        assert!(notifier.lines().is_empty());
    }

    #[test]
    fn test_bad_payload_does_not_notify() {
        let (bridge, notifier, _regs) = bridge_with_defaults();
        bridge.receive(&inbound("alarmTriggered", json!({"level": "high"})));
        assert!(notifier.lines().is_empty());
    }

    #[test]
    fn test_registrations_remove_defaults() {
        let (bridge, notifier, regs) = bridge_with_defaults();
        assert_eq!(regs.len(), 3);

        for registration in regs {
            assert!(registration.unregister());
        }
        bridge.receive(&inbound("alarmTriggered", json!({"level": 1})));

        assert!(notifier.lines().is_empty());
    }
}
