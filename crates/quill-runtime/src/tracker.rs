//! Per-user connection tracking
//!
//! Each authenticated user owns one cache set, `connections:user:{id}`,
//! holding the channels they are currently subscribed to. The set is
//! bounded and carries a sliding TTL so abandoned connections age out even
//! if the release hook never fires.

use std::sync::Arc;
use std::time::Duration;

use quill_channel::ChannelName;
use quill_core::{Principal, QuillResult, RealtimeConfig, UserId};
use quill_store::{Cache, SetAdd};
use tracing::{debug, warn};

/// Cache key of a user's connection set
pub fn connection_key(user: UserId) -> String {
    format!("connections:user:{}", user.get())
}

/// Outcome of tracking one channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tracked {
    /// Added to the user's record; the caller owns its release
    Inserted,
    /// The record already held this channel
    AlreadyHeld,
    /// Anonymous principal, nothing stored
    Untracked,
    /// User at capacity, nothing written
    Rejected,
}

impl Tracked {
    pub fn is_accepted(self) -> bool {
        self != Tracked::Rejected
    }
}

/// Bounds concurrent subscriptions per user
#[derive(Clone)]
pub struct ConnectionTracker {
    cache: Arc<dyn Cache>,
    max_connections: usize,
    ttl: Duration,
}

impl ConnectionTracker {
    pub fn new(cache: Arc<dyn Cache>, config: &RealtimeConfig) -> Self {
        ConnectionTracker {
            cache,
            max_connections: config.max_connections_per_user,
            ttl: config.connection_ttl,
        }
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Register a subscription. Returns false when the user is at capacity,
    /// in which case nothing is written. Anonymous principals always pass.
    pub fn track(&self, principal: &Principal, channel: &ChannelName) -> QuillResult<bool> {
        self.track_channel(principal, channel)
            .map(Tracked::is_accepted)
    }

    /// Like [`track`](Self::track), but tells a fresh entry apart from a
    /// channel the user's record already held.
    pub fn track_channel(
        &self,
        principal: &Principal,
        channel: &ChannelName,
    ) -> QuillResult<Tracked> {
        let Some(user) = principal.user_id() else {
            return Ok(Tracked::Untracked);
        };

        let key = connection_key(user);
        match self.cache.set_add_bounded(
            &key,
            &channel.to_string(),
            self.max_connections,
            self.ttl,
        )? {
            SetAdd::Added { count, inserted } => {
                debug!(user = user.get(), %channel, count, inserted, "connection tracked");
                Ok(if inserted {
                    Tracked::Inserted
                } else {
                    Tracked::AlreadyHeld
                })
            }
            SetAdd::Full(count) => {
                warn!(
                    user = user.get(),
                    %channel,
                    count,
                    limit = self.max_connections,
                    "connection limit reached"
                );
                Ok(Tracked::Rejected)
            }
        }
    }

    /// Forget a subscription; the set is dropped once it empties
    pub fn release(&self, principal: &Principal, channel: &ChannelName) -> QuillResult<()> {
        let Some(user) = principal.user_id() else {
            return Ok(());
        };

        let remaining = self
            .cache
            .set_remove(&connection_key(user), &channel.to_string(), self.ttl)?;
        debug!(user = user.get(), %channel, remaining, "connection released");
        Ok(())
    }

    /// Channels currently attributed to `user`
    pub fn active_channels(&self, user: UserId) -> QuillResult<Vec<String>> {
        self.cache.set_members(&connection_key(user))
    }
}
