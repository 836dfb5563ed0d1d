//! Push-channel abstraction for receiving device and monitor messages.
//!
//! The core consumes a single inbound stream of `(topic, payload)` pairs.
//! [`MessageSource`] hides where that stream comes from: a live MQTT
//! connection ([`MqttSource`]) in production, an in-memory channel
//! ([`ChannelSource`]) in tests. Payload bytes pass through unmodified;
//! parsing and parse failures are the subscriber's concern.

mod channel;
mod mqtt;

pub use channel::ChannelSource;
pub use mqtt::MqttSource;

use std::fmt::Debug;

/// Topic carrying monitor-service heartbeats.
pub const MONITOR_STATUS_TOPIC: &str = "monitor/status";

/// Wildcard subscription covering the per-device status topic family.
pub const DEVICE_STATUS_PATTERN: &str = "websockets/+/status";

/// One raw inbound message from the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Observable state of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Extract the device id from a `websockets/{deviceId}/status` topic.
///
/// Returns `None` for anything else, including deeper topic levels; such
/// messages are silently ignored by the dispatcher.
pub fn device_id_from_topic(topic: &str) -> Option<&str> {
    let id = topic.strip_prefix("websockets/")?.strip_suffix("/status")?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(id)
}

/// A source of push messages.
///
/// `poll` is non-blocking: the TUI loop drains the source between renders,
/// which keeps all store mutation on one logical thread.
pub trait MessageSource: Send + Debug {
    /// Take the next pending message, if any.
    fn poll(&mut self) -> Option<PushMessage>;

    /// Current connection state, for display.
    fn connection_state(&self) -> ConnectionState;

    /// Human-readable description of the source.
    fn description(&self) -> &str;

    /// The most recent transport error, if any.
    fn last_error(&self) -> Option<String>;

    /// Tear the source down. Called once, at application teardown, never
    /// on view changes, since the connection is session-scoped.
    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_from_topic() {
        assert_eq!(device_id_from_topic("websockets/kitchen-pi/status"), Some("kitchen-pi"));
        assert_eq!(device_id_from_topic("websockets/a1b2/status"), Some("a1b2"));
    }

    #[test]
    fn test_unrelated_topics_do_not_match() {
        assert_eq!(device_id_from_topic("monitor/status"), None);
        assert_eq!(device_id_from_topic("websockets/status"), None);
        assert_eq!(device_id_from_topic("websockets//status"), None);
        assert_eq!(device_id_from_topic("websockets/d1/config"), None);
        assert_eq!(device_id_from_topic("websockets/d1/extra/status"), None);
    }
}
