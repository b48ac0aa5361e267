//! Recording delivery transport

use std::collections::HashSet;

use parking_lot::Mutex;
use quill_channel::ChannelName;
use quill_core::{QuillError, QuillResult};
use quill_events::{Delivery, DeliveryTransport};

/// Keeps every successful write; channels marked failing reject writes
#[derive(Default)]
pub struct RecordingTransport {
    deliveries: Mutex<Vec<Delivery>>,
    failing: Mutex<HashSet<ChannelName>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `channel` fail until [`heal`](Self::heal)
    pub fn fail(&self, channel: ChannelName) {
        self.failing.lock().insert(channel);
    }

    pub fn heal(&self, channel: ChannelName) {
        self.failing.lock().remove(&channel);
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    /// Channels written to, in write order
    pub fn channels(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .iter()
            .map(|d| d.channel.to_string())
            .collect()
    }

    /// Decoded payloads delivered to `channel`
    pub fn payloads_for(&self, channel: ChannelName) -> Vec<serde_json::Value> {
        self.deliveries
            .lock()
            .iter()
            .filter(|d| d.channel == channel)
            .filter_map(|d| serde_json::from_str(&d.payload).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.deliveries.lock().clear();
    }
}

impl DeliveryTransport for RecordingTransport {
    fn write(&self, channel: &ChannelName, event_type: &str, payload: &str) -> QuillResult<()> {
        if self.failing.lock().contains(channel) {
            return Err(QuillError::DeliveryFailure {
                channel: channel.to_string(),
                reason: "injected failure".into(),
            });
        }
        self.deliveries.lock().push(Delivery {
            channel: *channel,
            event_type: event_type.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::UserId;

    #[test]
    fn test_failure_injection_and_heal() {
        let transport = RecordingTransport::new();
        let channel = ChannelName::user(UserId::new(1));

        transport.fail(channel);
        assert!(transport.write(&channel, "notification", "{}").is_err());
        assert!(transport.is_empty());

        transport.heal(channel);
        transport.write(&channel, "notification", "{}").unwrap();
        assert_eq!(transport.channels(), ["user-1"]);
    }
}
