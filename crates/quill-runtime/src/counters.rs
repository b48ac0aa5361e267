//! Article counters
//!
//! Views are incremented at the entity store, which is the durability
//! boundary; the cache only ever holds a copy. Likes and comments are
//! read-through: a cached value if one is live, otherwise a recount that is
//! written back with the counter TTL.

use std::sync::Arc;
use std::time::Duration;

use quill_core::{ArticleId, EntityStore, QuillResult, RealtimeConfig};
use quill_events::Publisher;
use quill_store::Cache;
use tracing::{debug, warn};

pub fn views_key(article: ArticleId) -> String {
    format!("article_views:{}", article.get())
}

pub fn likes_key(article: ArticleId) -> String {
    format!("article_likes:{}", article.get())
}

pub fn comments_key(article: ArticleId) -> String {
    format!("article_comments:{}", article.get())
}

/// Counter manager
#[derive(Clone)]
pub struct CounterManager {
    cache: Arc<dyn Cache>,
    store: Arc<dyn EntityStore>,
    publisher: Arc<Publisher>,
    ttl: Duration,
}

impl CounterManager {
    pub fn new(
        cache: Arc<dyn Cache>,
        store: Arc<dyn EntityStore>,
        publisher: Arc<Publisher>,
        config: &RealtimeConfig,
    ) -> Self {
        CounterManager {
            cache,
            store,
            publisher,
            ttl: config.counter_cache_ttl,
        }
    }

    /// Atomically count one view, then announce the new total.
    ///
    /// The view event goes out only after the store has recorded the
    /// increment. Cache and publish failures do not fail the call.
    pub fn increment_views(&self, article: ArticleId) -> QuillResult<u64> {
        let views = self.store.increment_views(article)?;

        if let Err(e) = self.cache.set(&views_key(article), &views.to_string(), self.ttl) {
            warn!(article = article.get(), error = %e, "failed to cache view count");
        }

        match self.store.article(article) {
            Ok(Some(record)) => {
                self.publisher.publish_view(&record, views);
            }
            Ok(None) => warn!(article = article.get(), "article vanished before view event"),
            Err(e) => warn!(article = article.get(), error = %e, "failed to load article for view event"),
        }

        debug!(article = article.get(), views, "view counted");
        Ok(views)
    }

    /// Views of `article`; 0 when the article does not exist
    pub fn get_views(&self, article: ArticleId) -> QuillResult<u64> {
        self.read_through(&views_key(article), || {
            Ok(self
                .store
                .article(article)?
                .map(|record| record.views_count)
                .unwrap_or(0))
        })
    }

    pub fn get_like_count(&self, article: ArticleId) -> QuillResult<u64> {
        self.read_through(&likes_key(article), || self.store.like_count(article))
    }

    /// Approved comments only
    pub fn get_comment_count(&self, article: ArticleId) -> QuillResult<u64> {
        self.read_through(&comments_key(article), || {
            self.store.approved_comment_count(article)
        })
    }

    /// Drop all cached counters of `article` in one batch
    pub fn invalidate(&self, article: ArticleId) -> QuillResult<usize> {
        let keys = [views_key(article), likes_key(article), comments_key(article)];
        let removed = self.cache.delete_many(&keys)?;
        debug!(article = article.get(), removed, "counters invalidated");
        Ok(removed)
    }

    fn read_through<F>(&self, key: &str, recount: F) -> QuillResult<u64>
    where
        F: FnOnce() -> QuillResult<u64>,
    {
        match self.cache.get(key) {
            Ok(Some(raw)) => match raw.parse::<u64>() {
                Ok(value) => return Ok(value),
                Err(_) => warn!(key, raw = %raw, "discarding unparsable counter"),
            },
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "counter cache read failed"),
        }

        let value = recount()?;
        if let Err(e) = self.cache.set(key, &value.to_string(), self.ttl) {
            warn!(key, error = %e, "failed to cache counter");
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quill_core::{
        ArticleRecord, Clock, LikeId, LikeRecord, ManualClock, UserId, UserRecord,
    };
    use quill_events::{BroadcastHub, StatsSnapshot};
    use quill_store::{MemoryCache, MemoryStore};

    struct Fixture {
        clock: Arc<ManualClock>,
        cache: Arc<MemoryCache>,
        store: Arc<MemoryStore>,
        publisher: Arc<Publisher>,
        counters: CounterManager,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(Publisher::with_clock(
            Arc::new(BroadcastHub::from_config(&RealtimeConfig::default())),
            clock.clone(),
        ));
        let counters = CounterManager::new(
            cache.clone(),
            store.clone(),
            publisher.clone(),
            &RealtimeConfig::default(),
        );

        let author = UserRecord::new(UserId::new(1), "ada");
        store.insert_user(author.clone());
        store.insert_article(ArticleRecord::new(ArticleId::new(7), author, clock.now()));

        Fixture {
            clock,
            cache,
            store,
            publisher,
            counters,
        }
    }

    fn like(id: u64, article: u64, user: u64) -> LikeRecord {
        LikeRecord {
            id: LikeId(id),
            article_id: ArticleId::new(article),
            user_id: UserId::new(user),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_increment_persists_caches_and_publishes() {
        let f = fixture();
        let article = ArticleId::new(7);

        assert_eq!(f.counters.increment_views(article).unwrap(), 1);
        assert_eq!(f.counters.increment_views(article).unwrap(), 2);

        assert_eq!(f.cache.get(&views_key(article)).unwrap().as_deref(), Some("2"));
        assert_eq!(f.counters.get_views(article).unwrap(), 2);
        assert_eq!(
            f.publisher.stats(),
            StatsSnapshot {
                delivered: 2,
                failed: 0
            }
        );
    }

    #[test]
    fn test_increment_missing_article_publishes_nothing() {
        let f = fixture();
        let err = f.counters.increment_views(ArticleId::new(99)).unwrap_err();

        assert_eq!(err.status_code(), 404);
        assert_eq!(f.publisher.stats(), StatsSnapshot::default());
    }

    #[test]
    fn test_views_of_missing_article_is_zero() {
        let f = fixture();
        assert_eq!(f.counters.get_views(ArticleId::new(99)).unwrap(), 0);
    }

    #[test]
    fn test_cached_counts_are_served_until_expiry_or_invalidation() {
        let f = fixture();
        let article = ArticleId::new(7);

        f.store.insert_like(like(1, 7, 2));
        assert_eq!(f.counters.get_like_count(article).unwrap(), 1);

        f.store.insert_like(like(2, 7, 3));
        assert_eq!(f.counters.get_like_count(article).unwrap(), 1);

        f.clock.advance(Duration::from_secs(301));
        assert_eq!(f.counters.get_like_count(article).unwrap(), 2);

        f.store.insert_like(like(3, 7, 4));
        assert_eq!(f.counters.invalidate(article).unwrap(), 1);
        assert_eq!(f.counters.get_like_count(article).unwrap(), 3);
    }

    #[test]
    fn test_unparsable_cache_entry_is_recounted() {
        let f = fixture();
        let article = ArticleId::new(7);

        f.cache
            .set(&comments_key(article), "garbage", Duration::from_secs(60))
            .unwrap();
        assert_eq!(f.counters.get_comment_count(article).unwrap(), 0);
        assert_eq!(
            f.cache.get(&comments_key(article)).unwrap().as_deref(),
            Some("0")
        );
    }
}
