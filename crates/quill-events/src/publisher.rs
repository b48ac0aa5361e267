//! Event publisher - fan-out with per-channel isolation
//!
//! Each destination gets its own copy of the event with `metadata.channel`
//! rewritten to that destination, then an independent transport write. A
//! failed write is logged, counted and reported as `false` for its channel;
//! it never stops the remaining writes and never reaches the caller as an
//! error. Delivery is best-effort and at-most-once per channel.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use quill_channel::ChannelName;
use quill_core::{
    ArticleRecord, CategoryRecord, Clock, CommentRecord, LikeRecord, SystemClock, UserId,
    UserRecord,
};
use tracing::{debug, error};

use crate::{Action, DeliveryTransport, Event};

/// Per-channel outcome of a fan-out
pub type DeliveryReport = BTreeMap<ChannelName, bool>;

/// True only if every channel in the report succeeded
pub fn all_delivered(report: &DeliveryReport) -> bool {
    report.values().all(|ok| *ok)
}

/// Delivery counters
#[derive(Debug, Default)]
pub struct PublishStats {
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`PublishStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub delivered: u64,
    pub failed: u64,
}

impl PublishStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Destinations of an article event
pub fn article_fanout(article: &ArticleRecord, action: Action) -> Vec<ChannelName> {
    let mut channels = vec![ChannelName::article(article.id)];
    if let Some(category) = article.category_id {
        channels.push(ChannelName::category(category));
    }
    if action == Action::Published {
        channels.push(ChannelName::GlobalNotifications);
    }
    channels
}

/// Event publisher
pub struct Publisher {
    transport: Arc<dyn DeliveryTransport>,
    clock: Arc<dyn Clock>,
    stats: PublishStats,
}

impl Publisher {
    pub fn new(transport: Arc<dyn DeliveryTransport>) -> Self {
        Self::with_clock(transport, Arc::new(SystemClock))
    }

    pub fn with_clock(transport: Arc<dyn DeliveryTransport>, clock: Arc<dyn Clock>) -> Self {
        Publisher {
            transport,
            clock,
            stats: PublishStats::default(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Deliver `event` to one channel, addressed to that channel
    pub fn publish(&self, channel: ChannelName, event: &Event) -> bool {
        let mut event = event.clone();
        event.set_channel(channel);

        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!(%channel, error = %e, "failed to serialize event");
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        let event_type = event.event_type().as_str();
        match self.transport.write(&channel, event_type, &payload) {
            Ok(()) => {
                debug!(%channel, event_type, action = event.action().as_str(), "event published");
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                error!(%channel, event_type, error = %e, "failed to publish event");
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Deliver `event` to each channel independently
    pub fn publish_to_many(&self, channels: &[ChannelName], event: &Event) -> DeliveryReport {
        channels
            .iter()
            .map(|channel| (*channel, self.publish(*channel, event)))
            .collect()
    }

    /// Comments go to the comments facet and the main article channel
    pub fn publish_comment(&self, comment: &CommentRecord, action: Action) -> bool {
        let event = Event::comment(comment, action);
        let channels = [
            ChannelName::article_comments(comment.article_id),
            ChannelName::article(comment.article_id),
        ];
        all_delivered(&self.publish_to_many(&channels, &event))
    }

    /// Likes go to the likes facet and the main article channel
    pub fn publish_like(&self, like: &LikeRecord, action: Action) -> bool {
        let event = Event::like(like, action);
        let channels = [
            ChannelName::article_likes(like.article_id),
            ChannelName::article(like.article_id),
        ];
        all_delivered(&self.publish_to_many(&channels, &event))
    }

    /// Views only go to the views facet; the main channel is not echoed
    pub fn publish_view(&self, article: &ArticleRecord, views_count: u64) -> bool {
        let event = Event::view(article, views_count);
        self.publish(ChannelName::article_views(article.id), &event)
    }

    /// Article channel, plus category if any, plus global notifications on publish
    pub fn publish_article(&self, article: &ArticleRecord, action: Action) -> bool {
        let event = Event::article(article, action);
        all_delivered(&self.publish_to_many(&article_fanout(article, action), &event))
    }

    pub fn publish_editing(
        &self,
        article: &ArticleRecord,
        user: &UserRecord,
        action: Action,
        cursor_position: Option<u64>,
    ) -> bool {
        let event = Event::editing(article, user, action, cursor_position);
        self.publish(ChannelName::article_editing(article.id), &event)
    }

    pub fn publish_category(&self, category: &CategoryRecord, action: Action) -> bool {
        let event = Event::category(category, action);
        self.publish(ChannelName::category(category.id), &event)
    }

    pub fn publish_user_notification(&self, user: UserId, data: serde_json::Value) -> bool {
        let event = Event::notification(user, data, &self.clock.now());
        self.publish(ChannelName::user(user), &event)
    }

    pub fn publish_announcement(&self, data: serde_json::Value) -> bool {
        let event = Event::announcement(data, &self.clock.now());
        self.publish(ChannelName::GlobalAnnouncements, &event)
    }
}
