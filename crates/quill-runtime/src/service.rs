//! Caller-facing realtime service
//!
//! `RealtimeService` is built once per process and shared with every request
//! handler. Each operation applies the same gatekeeping order: identity
//! (401), entity lookup (404), permission (403), capacity (429).

use std::sync::Arc;
use std::time::Duration;

use quill_channel::{can_edit, AccessPolicy, ChannelName};
use quill_core::{
    ArticleId, ArticleRecord, Clock, EntityStore, Principal, QuillError, QuillResult,
    RealtimeConfig, SessionToken, UserRecord,
};
use quill_events::{DeliveryTransport, Publisher};
use quill_store::Cache;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::{
    ActiveEditor, ConnectionTracker, ContentHooks, CounterManager, EditingManager, Tracked,
};

/// A granted subscription.
///
/// Dropping it (client disconnect) gives back to the connection tracker the
/// channels this subscription added to the user's record. Channels the
/// record already held belong to whichever subscription added them.
pub struct Subscription {
    tracker: ConnectionTracker,
    principal: Principal,
    channels: Vec<ChannelName>,
    tracked: Vec<ChannelName>,
}

impl Subscription {
    fn new(tracker: ConnectionTracker, principal: Principal) -> Self {
        Subscription {
            tracker,
            principal,
            channels: Vec::new(),
            tracked: Vec::new(),
        }
    }

    pub fn channels(&self) -> &[ChannelName] {
        &self.channels
    }

    /// Channels this subscription added to the connection record
    pub fn tracked(&self) -> &[ChannelName] {
        &self.tracked
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for channel in self.tracked.drain(..) {
            if let Err(e) = self.tracker.release(&self.principal, &channel) {
                warn!(%channel, error = %e, "failed to release connection");
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("principal", &self.principal)
            .field("channels", &self.channels)
            .field("tracked", &self.tracked)
            .finish()
    }
}

/// Cached counters of one article
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ArticleStats {
    pub views_count: u64,
    pub likes_count: u64,
    pub comments_count: u64,
}

/// Reply to a successful editing start
#[derive(Clone, Debug, Serialize)]
pub struct StartedSession {
    pub session_id: SessionToken,
    pub active_editors: Vec<ActiveEditor>,
    #[serde(serialize_with = "as_secs")]
    pub heartbeat_interval: Duration,
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

/// Realtime service
pub struct RealtimeService {
    config: RealtimeConfig,
    store: Arc<dyn EntityStore>,
    access: AccessPolicy,
    tracker: ConnectionTracker,
    publisher: Arc<Publisher>,
    counters: CounterManager,
    editing: EditingManager,
    hooks: ContentHooks,
}

impl RealtimeService {
    /// Wire every component to the shared collaborators
    pub fn new(
        config: RealtimeConfig,
        cache: Arc<dyn Cache>,
        store: Arc<dyn EntityStore>,
        transport: Arc<dyn DeliveryTransport>,
        clock: Arc<dyn Clock>,
    ) -> QuillResult<Self> {
        config.validate()?;

        let publisher = Arc::new(Publisher::with_clock(transport, clock.clone()));
        let counters =
            CounterManager::new(cache.clone(), store.clone(), publisher.clone(), &config);
        let editing = EditingManager::new(
            cache.clone(),
            store.clone(),
            publisher.clone(),
            clock,
            &config,
        );
        let hooks = ContentHooks::new(publisher.clone(), counters.clone());

        Ok(RealtimeService {
            access: AccessPolicy::new(store.clone()),
            tracker: ConnectionTracker::new(cache, &config),
            config,
            store,
            publisher,
            counters,
            editing,
            hooks,
        })
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    pub fn access(&self) -> &AccessPolicy {
        &self.access
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    pub fn counters(&self) -> &CounterManager {
        &self.counters
    }

    pub fn editing(&self) -> &EditingManager {
        &self.editing
    }

    pub fn hooks(&self) -> &ContentHooks {
        &self.hooks
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Subscribe to any set of channels. Channels the principal may not see
    /// are skipped; if none remain the request is refused. Capacity is
    /// checked per channel and a rejection releases only the channels this
    /// call added to the record, so other live subscriptions keep theirs.
    pub fn subscribe_channels(
        &self,
        principal: &Principal,
        channels: &[ChannelName],
    ) -> QuillResult<Subscription> {
        let mut allowed: Vec<ChannelName> = Vec::with_capacity(channels.len());
        for channel in channels {
            if allowed.contains(channel) {
                continue;
            }
            if self.access.can_subscribe(principal, channel) {
                allowed.push(*channel);
            } else {
                debug!(%channel, "channel not permitted, skipping");
            }
        }

        if allowed.is_empty() {
            let denied = channels
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            return Err(QuillError::PermissionDenied { channel: denied });
        }

        let mut subscription = Subscription::new(self.tracker.clone(), *principal);
        for channel in allowed {
            match self.tracker.track_channel(principal, &channel)? {
                Tracked::Rejected => return Err(self.rate_limited(principal)),
                Tracked::Inserted => subscription.tracked.push(channel),
                Tracked::AlreadyHeld | Tracked::Untracked => {}
            }
            subscription.channels.push(channel);
        }
        Ok(subscription)
    }

    /// The five channels of a published article
    pub fn subscribe_article(
        &self,
        principal: &Principal,
        article: ArticleId,
    ) -> QuillResult<Subscription> {
        self.published_article(article)?;
        self.subscribe_channels(principal, &ChannelName::article_channels(article))
    }

    /// The principal's private channel plus global notifications
    pub fn subscribe_user(&self, principal: &Principal) -> QuillResult<Subscription> {
        let user = principal.user_id().ok_or(QuillError::Unauthenticated)?;
        self.subscribe_channels(principal, &ChannelName::user_channels(user))
    }

    pub fn subscribe_global(&self, principal: &Principal) -> QuillResult<Subscription> {
        self.subscribe_channels(
            principal,
            &[ChannelName::GlobalNotifications, ChannelName::GlobalAnnouncements],
        )
    }

    /// The editing channel of an article the principal may edit
    pub fn subscribe_editing(
        &self,
        principal: &Principal,
        article: ArticleId,
    ) -> QuillResult<Subscription> {
        if !principal.is_authenticated() {
            return Err(QuillError::Unauthenticated);
        }
        let record = self.article(article)?;
        if !can_edit(principal, &record) {
            return Err(QuillError::EditPermissionRequired);
        }
        self.subscribe_channels(principal, &[ChannelName::article_editing(article)])
    }

    // ========================================================================
    // Counters
    // ========================================================================

    pub fn increment_view(&self, principal: &Principal, article: ArticleId) -> QuillResult<u64> {
        if !principal.is_authenticated() {
            return Err(QuillError::Unauthenticated);
        }
        self.published_article(article)?;
        self.counters.increment_views(article)
    }

    /// Counters of any existing article, published or not
    pub fn article_stats(&self, article: ArticleId) -> QuillResult<ArticleStats> {
        self.article(article)?;
        Ok(ArticleStats {
            views_count: self.counters.get_views(article)?,
            likes_count: self.counters.get_like_count(article)?,
            comments_count: self.counters.get_comment_count(article)?,
        })
    }

    // ========================================================================
    // Editing
    // ========================================================================

    pub fn start_editing(
        &self,
        principal: &Principal,
        article: ArticleId,
    ) -> QuillResult<StartedSession> {
        let (record, user) = self.editor_context(principal, article)?;
        let session_id = self.editing.start_session(&record, &user)?;
        Ok(StartedSession {
            session_id,
            active_editors: self.editing.list_active_editors(article)?,
            heartbeat_interval: self.config.heartbeat_interval,
        })
    }

    pub fn update_cursor(
        &self,
        principal: &Principal,
        article: ArticleId,
        position: u64,
    ) -> QuillResult<bool> {
        let (record, user) = self.editor_context(principal, article)?;
        Ok(self.editing.update_cursor(&record, &user, position))
    }

    pub fn heartbeat(&self, principal: &Principal, article: ArticleId) -> QuillResult<bool> {
        let (record, user) = self.editor_context(principal, article)?;
        self.editing.heartbeat(&record, &user)
    }

    pub fn end_editing(&self, principal: &Principal, article: ArticleId) -> QuillResult<bool> {
        let (record, user) = self.editor_context(principal, article)?;
        self.editing.end_session(&record, &user)
    }

    pub fn active_editors(&self, article: ArticleId) -> QuillResult<Vec<ActiveEditor>> {
        self.article(article)?;
        self.editing.list_active_editors(article)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn article(&self, id: ArticleId) -> QuillResult<ArticleRecord> {
        self.store.article(id)?.ok_or(QuillError::ArticleNotFound(id))
    }

    fn published_article(&self, id: ArticleId) -> QuillResult<ArticleRecord> {
        self.store
            .article(id)?
            .filter(ArticleRecord::is_published)
            .ok_or(QuillError::ArticleNotFound(id))
    }

    /// 401, then 404, then 403; yields the article and the acting user
    fn editor_context(
        &self,
        principal: &Principal,
        article: ArticleId,
    ) -> QuillResult<(ArticleRecord, UserRecord)> {
        let user_id = principal.user_id().ok_or(QuillError::Unauthenticated)?;
        let record = self.article(article)?;
        if !can_edit(principal, &record) {
            return Err(QuillError::EditPermissionRequired);
        }
        let user = self
            .store
            .user(user_id)?
            .ok_or(QuillError::UserNotFound(user_id))?;
        Ok((record, user))
    }

    fn rate_limited(&self, principal: &Principal) -> QuillError {
        match principal.user_id() {
            Some(user) => QuillError::RateLimited {
                user,
                limit: self.tracker.max_connections(),
            },
            None => QuillError::Unauthenticated,
        }
    }
}
