//! Entity records and the lookup seam to the content store
//!
//! Records are flat projections of the content system's entities, carrying
//! just enough to populate event payloads and make access decisions. The
//! content store itself is an external collaborator reached through
//! [`EntityStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ArticleId, CategoryId, CommentId, LikeId, QuillResult, SessionToken, UserId};

/// Publication status of an article
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ArticleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
            ArticleStatus::Archived => "archived",
        }
    }
}

/// User profile
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

impl UserRecord {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        UserRecord {
            id,
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    /// "First Last", trimmed; empty when neither is set
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Article projection
#[derive(Clone, Debug, PartialEq)]
pub struct ArticleRecord {
    pub id: ArticleId,
    /// Missing when no translation exists
    pub title: Option<String>,
    pub slug: Option<String>,
    pub status: ArticleStatus,
    pub author: UserRecord,
    pub category_id: Option<CategoryId>,
    pub reading_time: u32,
    pub views_count: u64,
    /// Denormalized "current editor session" pointer (last writer wins)
    pub editor_session_id: Option<SessionToken>,
    pub is_auto_saving: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub last_saved_at: DateTime<Utc>,
}

impl ArticleRecord {
    pub fn new(id: ArticleId, author: UserRecord, now: DateTime<Utc>) -> Self {
        ArticleRecord {
            id,
            title: None,
            slug: None,
            status: ArticleStatus::Draft,
            author,
            category_id: None,
            reading_time: 0,
            views_count: 0,
            editor_session_id: None,
            is_auto_saving: false,
            created_at: now,
            updated_at: now,
            published_at: None,
            last_saved_at: now,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>, slug: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self.slug = Some(slug.into());
        self
    }

    pub fn with_category(mut self, category: CategoryId) -> Self {
        self.category_id = Some(category);
        self
    }

    pub fn with_status(mut self, status: ArticleStatus) -> Self {
        self.status = status;
        self
    }

    #[inline]
    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published
    }

    #[inline]
    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.author.id == user
    }
}

/// Comment projection
#[derive(Clone, Debug, PartialEq)]
pub struct CommentRecord {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub author: UserRecord,
    pub content: String,
    pub parent_id: Option<CommentId>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentRecord {
    #[inline]
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Like projection
#[derive(Clone, Debug, PartialEq)]
pub struct LikeRecord {
    pub id: LikeId,
    pub article_id: ArticleId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Category projection
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lookups and the few writes this subsystem needs from the content store.
///
/// Absence is `Ok(None)`; errors are reserved for the store being unreachable.
pub trait EntityStore: Send + Sync {
    fn article(&self, id: ArticleId) -> QuillResult<Option<ArticleRecord>>;

    fn user(&self, id: UserId) -> QuillResult<Option<UserRecord>>;

    /// Increment the durable view count in place and return the new value.
    /// Must be atomic at the store: N concurrent calls add exactly N.
    fn increment_views(&self, id: ArticleId) -> QuillResult<u64>;

    fn like_count(&self, id: ArticleId) -> QuillResult<u64>;

    /// Count of approved comments only
    fn approved_comment_count(&self, id: ArticleId) -> QuillResult<u64>;

    /// Overwrite the article's editor session pointer
    fn set_editor_session(&self, id: ArticleId, session: &SessionToken) -> QuillResult<()>;

    /// Clear the pointer only if it still equals `expected`.
    /// Returns whether it was cleared.
    fn clear_editor_session_if(&self, id: ArticleId, expected: &SessionToken) -> QuillResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let user = UserRecord::new(UserId::new(1), "ada").with_name("Ada", "Lovelace");
        assert_eq!(user.full_name(), "Ada Lovelace");

        let bare = UserRecord::new(UserId::new(2), "anon");
        assert_eq!(bare.full_name(), "");

        let first_only = UserRecord::new(UserId::new(3), "x").with_name("Grace", "");
        assert_eq!(first_only.full_name(), "Grace");
    }

    #[test]
    fn test_article_builders() {
        let author = UserRecord::new(UserId::new(1), "ada");
        let article = ArticleRecord::new(ArticleId::new(7), author, Utc::now())
            .with_category(CategoryId::new(3))
            .with_status(ArticleStatus::Published);

        assert!(article.is_published());
        assert!(article.is_authored_by(UserId::new(1)));
        assert!(!article.is_authored_by(UserId::new(2)));
        assert_eq!(article.category_id, Some(CategoryId::new(3)));
        assert_eq!(article.title, None);
    }
}
