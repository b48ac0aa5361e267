//! Wired test fixture
//!
//! One service over in-memory collaborators. Time only moves when the test
//! advances the manual clock, so TTL expiry is deterministic.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use quill_core::{
    ArticleId, ArticleRecord, ArticleStatus, CategoryId, CategoryRecord, Clock, ManualClock,
    QuillResult, RealtimeConfig, UserId, UserRecord,
};
use quill_runtime::RealtimeService;
use quill_store::{MemoryCache, MemoryStore};

use crate::RecordingTransport;

/// Fixed start instant for every harness
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Fully wired service plus handles on every collaborator
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub cache: Arc<MemoryCache>,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<RecordingTransport>,
    pub service: RealtimeService,
}

impl Harness {
    /// Harness with default limits and TTLs
    pub fn new() -> QuillResult<Self> {
        Self::with_config(RealtimeConfig::default())
    }

    pub fn with_config(config: RealtimeConfig) -> QuillResult<Self> {
        let clock = Arc::new(ManualClock::new(epoch()));
        let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let service = RealtimeService::new(
            config,
            cache.clone(),
            store.clone(),
            transport.clone(),
            clock.clone(),
        )?;

        Ok(Harness {
            clock,
            cache,
            store,
            transport,
            service,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn add_user(&self, id: u64, username: &str) -> UserRecord {
        let user = UserRecord::new(UserId::new(id), username);
        self.store.insert_user(user.clone());
        user
    }

    pub fn add_staff(&self, id: u64, username: &str) -> UserRecord {
        let user = UserRecord::new(UserId::new(id), username).staff();
        self.store.insert_user(user.clone());
        user
    }

    pub fn add_article(
        &self,
        id: u64,
        author: &UserRecord,
        status: ArticleStatus,
        category: Option<u64>,
    ) -> ArticleRecord {
        let mut article = ArticleRecord::new(ArticleId::new(id), author.clone(), self.now())
            .with_title(format!("Article {}", id), format!("article-{}", id))
            .with_status(status);
        if status == ArticleStatus::Published {
            article.published_at = Some(self.now());
        }
        if let Some(category) = category {
            article = article.with_category(CategoryId::new(category));
        }
        self.store.insert_article(article.clone());
        article
    }

    pub fn add_category(&self, id: u64, name: &str) -> CategoryRecord {
        let category = CategoryRecord {
            id: CategoryId::new(id),
            name: Some(name.to_string()),
            slug: Some(name.to_lowercase()),
            description: String::new(),
            created_at: self.now(),
            updated_at: self.now(),
        };
        self.store.insert_category(category.clone());
        category
    }
}
