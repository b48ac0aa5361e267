//! Delivery transport

use std::collections::HashMap;

use parking_lot::RwLock;
use quill_channel::ChannelName;
use quill_core::{QuillResult, RealtimeConfig};
use tokio::sync::broadcast;

/// Writes serialized events into a channel's subscriber queues.
///
/// Fire-and-forget: success means the write was accepted, not that anyone
/// read it. Errors are transient and per channel.
pub trait DeliveryTransport: Send + Sync {
    fn write(&self, channel: &ChannelName, event_type: &str, payload: &str) -> QuillResult<()>;
}

/// One delivered event as seen by a listener
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub channel: ChannelName,
    pub event_type: String,
    pub payload: String,
}

/// In-process transport: one broadcast queue per channel
pub struct BroadcastHub {
    capacity: usize,
    channels: RwLock<HashMap<ChannelName, broadcast::Sender<Delivery>>>,
}

impl BroadcastHub {
    /// Create a hub buffering up to `capacity` deliveries per channel
    pub fn new(capacity: usize) -> Self {
        BroadcastHub {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Create a hub sized by `hub_capacity`
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self::new(config.hub_capacity)
    }

    /// Start listening on a channel
    pub fn listen(&self, channel: ChannelName) -> broadcast::Receiver<Delivery> {
        if let Some(tx) = self.channels.read().get(&channel) {
            return tx.subscribe();
        }
        self.channels
            .write()
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Live listeners on a channel
    pub fn listener_count(&self, channel: &ChannelName) -> usize {
        self.channels
            .read()
            .get(channel)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Drop queues nobody listens to any more. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut channels = self.channels.write();
        let before = channels.len();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        before - channels.len()
    }
}

impl DeliveryTransport for BroadcastHub {
    fn write(&self, channel: &ChannelName, event_type: &str, payload: &str) -> QuillResult<()> {
        let channels = self.channels.read();
        let Some(tx) = channels.get(channel) else {
            return Ok(());
        };
        // A send error only means every listener has gone away
        let _ = tx.send(Delivery {
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
    use quill_core::ArticleId;

    #[tokio::test]
    async fn test_hub_delivers_to_listeners() {
        let hub = BroadcastHub::new(8);
        let channel = ChannelName::article(ArticleId::new(1));
        let mut rx = hub.listen(channel);

        hub.write(&channel, "article", "{}").unwrap();

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.channel, channel);
        assert_eq!(delivery.event_type, "article");
        assert_eq!(delivery.payload, "{}");
    }

    #[tokio::test]
    async fn test_hub_isolates_channels() {
        let hub = BroadcastHub::new(8);
        let a = ChannelName::article(ArticleId::new(1));
        let b = ChannelName::article(ArticleId::new(2));
        let mut rx_a = hub.listen(a);
        let mut rx_b = hub.listen(b);

        hub.write(&b, "article", "b").unwrap();

        assert_eq!(rx_b.recv().await.unwrap().payload, "b");
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn test_write_without_listeners_is_accepted() {
        let hub = BroadcastHub::new(8);
        let channel = ChannelName::GlobalNotifications;
        assert!(hub.write(&channel, "article", "{}").is_ok());

        let rx = hub.listen(channel);
        drop(rx);
        assert!(hub.write(&channel, "article", "{}").is_ok());
        assert_eq!(hub.listener_count(&channel), 0);
        assert_eq!(hub.prune(), 1);
    }
}
