//! Collaborative editing sessions and presence
//!
//! One cache entry per (article, user) pair, `editing_session:{article}:{user}`,
//! lives for the session timeout and is kept alive by heartbeats. The
//! article's own `editor_session_id` is a single last-writer-wins pointer;
//! presence is read from the per-user entries, not from that pointer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quill_core::{
    serialize_timestamp, ArticleId, ArticleRecord, Clock, EntityStore, QuillResult,
    RealtimeConfig, SessionToken, UserId, UserRecord,
};
use quill_events::{Action, Publisher};
use quill_store::{Cache, CacheExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Cache key of one user's session on one article
pub fn session_key(article: ArticleId, user: UserId) -> String {
    format!("editing_session:{}:{}", article.get(), user.get())
}

/// Prefix shared by every session on `article`
fn session_prefix(article: ArticleId) -> String {
    format!("editing_session:{}:", article.get())
}

/// Stored session record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditingSession {
    pub session_id: SessionToken,
    pub user_id: UserId,
    pub article_id: ArticleId,
    #[serde(serialize_with = "serialize_timestamp")]
    pub started_at: DateTime<Utc>,
}

/// Presence entry
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActiveEditor {
    pub user_id: UserId,
    pub username: String,
    pub full_name: String,
    pub session_id: SessionToken,
    #[serde(serialize_with = "serialize_timestamp")]
    pub started_at: DateTime<Utc>,
}

/// Editing session manager
#[derive(Clone)]
pub struct EditingManager {
    cache: Arc<dyn Cache>,
    store: Arc<dyn EntityStore>,
    publisher: Arc<Publisher>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl EditingManager {
    pub fn new(
        cache: Arc<dyn Cache>,
        store: Arc<dyn EntityStore>,
        publisher: Arc<Publisher>,
        clock: Arc<dyn Clock>,
        config: &RealtimeConfig,
    ) -> Self {
        EditingManager {
            cache,
            store,
            publisher,
            clock,
            timeout: config.editing_session_timeout,
        }
    }

    /// Open (or replace) `user`'s session on `article` and point the article
    /// at it.
    pub fn start_session(
        &self,
        article: &ArticleRecord,
        user: &UserRecord,
    ) -> QuillResult<SessionToken> {
        let session = EditingSession {
            session_id: SessionToken::generate(),
            user_id: user.id,
            article_id: article.id,
            started_at: self.clock.now(),
        };

        self.cache
            .set_json(&session_key(article.id, user.id), &session, self.timeout)?;
        self.store.set_editor_session(article.id, &session.session_id)?;

        let mut article = article.clone();
        article.editor_session_id = Some(session.session_id.clone());
        self.publisher
            .publish_editing(&article, user, Action::SessionStarted, None);

        info!(
            article = article.id.get(),
            user = user.id.get(),
            session = %session.session_id,
            "editing session started"
        );
        Ok(session.session_id)
    }

    /// Broadcast a cursor move; nothing is stored
    pub fn update_cursor(&self, article: &ArticleRecord, user: &UserRecord, position: u64) -> bool {
        self.publisher
            .publish_editing(article, user, Action::CursorMoved, Some(position))
    }

    /// Keep a live session alive. Returns false, and publishes nothing, when
    /// there is no live session to extend.
    pub fn heartbeat(&self, article: &ArticleRecord, user: &UserRecord) -> QuillResult<bool> {
        let key = session_key(article.id, user.id);
        if !self.cache.expire(&key, self.timeout)? {
            debug!(article = article.id.get(), user = user.id.get(), "heartbeat without session");
            return Ok(false);
        }

        self.publisher
            .publish_editing(article, user, Action::Heartbeat, None);
        Ok(true)
    }

    /// Close `user`'s session on `article`. The article pointer is cleared
    /// only if it still names this session. Returns whether a session existed.
    pub fn end_session(&self, article: &ArticleRecord, user: &UserRecord) -> QuillResult<bool> {
        let key = session_key(article.id, user.id);
        let session = match self.cache.get_json::<EditingSession>(&key) {
            Ok(session) => session,
            Err(e) => {
                warn!(%key, error = %e, "discarding malformed editing session");
                None
            }
        };
        self.cache.delete(&key)?;

        let mut article = article.clone();
        if let Some(session) = &session {
            if self
                .store
                .clear_editor_session_if(article.id, &session.session_id)?
            {
                article.editor_session_id = None;
            }
        }

        self.publisher
            .publish_editing(&article, user, Action::SessionEnded, None);

        info!(
            article = article.id.get(),
            user = user.id.get(),
            "editing session ended"
        );
        Ok(session.is_some())
    }

    /// Users with a live session on `article`, oldest session first.
    ///
    /// Entries whose user no longer resolves, or that cannot be decoded, are
    /// deleted during the scan.
    pub fn list_active_editors(&self, article: ArticleId) -> QuillResult<Vec<ActiveEditor>> {
        let mut editors = Vec::new();

        for key in self.cache.keys_with_prefix(&session_prefix(article))? {
            let session = match self.cache.get_json::<EditingSession>(&key) {
                Ok(Some(session)) => session,
                // Expired between the scan and the read
                Ok(None) => continue,
                Err(e) => {
                    warn!(%key, error = %e, "removing malformed editing session");
                    self.cache.delete(&key)?;
                    continue;
                }
            };

            match self.store.user(session.user_id)? {
                Some(user) => editors.push(ActiveEditor {
                    user_id: user.id,
                    full_name: user.full_name(),
                    username: user.username,
                    session_id: session.session_id,
                    started_at: session.started_at,
                }),
                None => {
                    warn!(%key, user = session.user_id.get(), "removing orphaned editing session");
                    self.cache.delete(&key)?;
                }
            }
        }

        editors.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then(a.user_id.cmp(&b.user_id))
        });
        Ok(editors)
    }

    /// The stored session of one user, if live
    pub fn session(&self, article: ArticleId, user: UserId) -> QuillResult<Option<EditingSession>> {
        self.cache.get_json(&session_key(article, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use quill_core::ManualClock;
    use quill_events::BroadcastHub;
    use quill_store::{MemoryCache, MemoryStore};

    struct Fixture {
        clock: Arc<ManualClock>,
        cache: Arc<MemoryCache>,
        store: Arc<MemoryStore>,
        publisher: Arc<Publisher>,
        editing: EditingManager,
        article: ArticleRecord,
        ada: UserRecord,
        bob: UserRecord,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(Publisher::with_clock(
            Arc::new(BroadcastHub::from_config(&RealtimeConfig::default())),
            clock.clone(),
        ));
        let editing = EditingManager::new(
            cache.clone(),
            store.clone(),
            publisher.clone(),
            clock.clone(),
            &RealtimeConfig::default(),
        );

        let ada = UserRecord::new(UserId::new(1), "ada").with_name("Ada", "Lovelace");
        let bob = UserRecord::new(UserId::new(2), "bob");
        store.insert_user(ada.clone());
        store.insert_user(bob.clone());
        let article = ArticleRecord::new(ArticleId::new(7), ada.clone(), clock.now());
        store.insert_article(article.clone());

        Fixture {
            clock,
            cache,
            store,
            publisher,
            editing,
            article,
            ada,
            bob,
        }
    }

    fn pointer(f: &Fixture) -> Option<SessionToken> {
        f.store
            .article(f.article.id)
            .unwrap()
            .and_then(|a| a.editor_session_id)
    }

    #[test]
    fn test_presence_lifecycle() {
        let f = fixture();

        f.editing.start_session(&f.article, &f.ada).unwrap();
        f.clock.advance(Duration::from_secs(1));
        f.editing.start_session(&f.article, &f.bob).unwrap();

        let editors = f.editing.list_active_editors(f.article.id).unwrap();
        assert_eq!(editors.len(), 2);
        assert_eq!(editors[0].username, "ada");
        assert_eq!(editors[0].full_name, "Ada Lovelace");

        assert!(f.editing.end_session(&f.article, &f.ada).unwrap());
        let editors = f.editing.list_active_editors(f.article.id).unwrap();
        assert_eq!(editors.len(), 1);
        assert_eq!(editors[0].user_id, UserId::new(2));
    }

    #[test]
    fn test_restart_replaces_own_entry() {
        let f = fixture();

        let first = f.editing.start_session(&f.article, &f.ada).unwrap();
        let second = f.editing.start_session(&f.article, &f.ada).unwrap();

        assert_ne!(first, second);
        let editors = f.editing.list_active_editors(f.article.id).unwrap();
        assert_eq!(editors.len(), 1);
        assert_eq!(editors[0].session_id, second);
    }

    #[test]
    fn test_pointer_is_last_writer_wins_and_cleared_on_match() {
        let f = fixture();

        f.editing.start_session(&f.article, &f.ada).unwrap();
        let bobs = f.editing.start_session(&f.article, &f.bob).unwrap();
        assert_eq!(pointer(&f), Some(bobs.clone()));

        // Ada's session is not the pointer, so ending it leaves Bob's in place
        f.editing.end_session(&f.article, &f.ada).unwrap();
        assert_eq!(pointer(&f), Some(bobs));

        f.editing.end_session(&f.article, &f.bob).unwrap();
        assert_eq!(pointer(&f), None);
    }

    #[test]
    fn test_session_expires_without_heartbeat() {
        let f = fixture();

        f.editing.start_session(&f.article, &f.ada).unwrap();
        f.clock.advance(Duration::from_secs(20 * 60));
        assert!(f.editing.heartbeat(&f.article, &f.ada).unwrap());
        f.clock.advance(Duration::from_secs(20 * 60));
        assert_eq!(f.editing.list_active_editors(f.article.id).unwrap().len(), 1);

        f.clock.advance(Duration::from_secs(11 * 60));
        assert!(f.editing.list_active_editors(f.article.id).unwrap().is_empty());

        let published = f.publisher.stats();
        assert!(!f.editing.heartbeat(&f.article, &f.ada).unwrap());
        assert_eq!(f.publisher.stats(), published);
        assert!(f.editing.session(f.article.id, f.ada.id).unwrap().is_none());
    }

    #[test]
    fn test_started_at_uses_fixed_precision() {
        let f = fixture();
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        f.clock.set(start);

        f.editing.start_session(&f.article, &f.ada).unwrap();

        let editors = f.editing.list_active_editors(f.article.id).unwrap();
        let reply = serde_json::to_value(&editors[0]).unwrap();
        assert_eq!(reply["started_at"], "2024-01-15T09:30:00.000000Z");

        let stored = f.cache.get(&session_key(f.article.id, f.ada.id)).unwrap().unwrap();
        assert!(stored.contains("\"started_at\":\"2024-01-15T09:30:00.000000Z\""));
        let session = f.editing.session(f.article.id, f.ada.id).unwrap().unwrap();
        assert_eq!(session.started_at, start);
    }

    #[test]
    fn test_orphaned_and_malformed_entries_are_removed() {
        let f = fixture();

        f.editing.start_session(&f.article, &f.ada).unwrap();
        f.editing.start_session(&f.article, &f.bob).unwrap();
        f.store.remove_user(f.bob.id);
        f.cache
            .set(
                &session_key(f.article.id, UserId::new(3)),
                "not json",
                Duration::from_secs(60),
            )
            .unwrap();

        let editors = f.editing.list_active_editors(f.article.id).unwrap();
        assert_eq!(editors.len(), 1);
        assert_eq!(editors[0].user_id, f.ada.id);
        assert_eq!(f.cache.len(), 1);
    }

    #[test]
    fn test_listing_ignores_other_articles() {
        let f = fixture();
        let other = ArticleRecord::new(ArticleId::new(70), f.ada.clone(), f.clock.now());
        f.store.insert_article(other.clone());

        f.editing.start_session(&other, &f.bob).unwrap();
        assert!(f.editing.list_active_editors(f.article.id).unwrap().is_empty());
        assert_eq!(f.editing.list_active_editors(other.id).unwrap().len(), 1);
    }

    #[test]
    fn test_end_without_session_is_harmless() {
        let f = fixture();
        assert!(!f.editing.end_session(&f.article, &f.bob).unwrap());
    }
}
