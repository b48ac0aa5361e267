//! In-memory entity store

use std::collections::HashMap;

use parking_lot::RwLock;
use quill_core::{
    ArticleId, ArticleRecord, CategoryId, CategoryRecord, CommentId, CommentRecord, EntityStore,
    LikeId, LikeRecord, QuillError, QuillResult, SessionToken, UserId, UserRecord,
};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, UserRecord>,
    articles: HashMap<ArticleId, ArticleRecord>,
    categories: HashMap<CategoryId, CategoryRecord>,
    comments: HashMap<CommentId, CommentRecord>,
    likes: HashMap<LikeId, LikeRecord>,
}

/// `EntityStore` over process-local tables.
///
/// View increments happen under the write lock, so they are atomic with
/// respect to every other store operation.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserRecord) {
        self.tables.write().users.insert(user.id, user);
    }

    pub fn remove_user(&self, id: UserId) -> Option<UserRecord> {
        self.tables.write().users.remove(&id)
    }

    pub fn insert_article(&self, article: ArticleRecord) {
        self.tables.write().articles.insert(article.id, article);
    }

    pub fn remove_article(&self, id: ArticleId) -> Option<ArticleRecord> {
        self.tables.write().articles.remove(&id)
    }

    pub fn insert_category(&self, category: CategoryRecord) {
        self.tables.write().categories.insert(category.id, category);
    }

    pub fn category(&self, id: CategoryId) -> Option<CategoryRecord> {
        self.tables.read().categories.get(&id).cloned()
    }

    pub fn insert_comment(&self, comment: CommentRecord) {
        self.tables.write().comments.insert(comment.id, comment);
    }

    pub fn remove_comment(&self, id: CommentId) -> Option<CommentRecord> {
        self.tables.write().comments.remove(&id)
    }

    pub fn insert_like(&self, like: LikeRecord) {
        self.tables.write().likes.insert(like.id, like);
    }

    pub fn remove_like(&self, id: LikeId) -> Option<LikeRecord> {
        self.tables.write().likes.remove(&id)
    }
}

impl EntityStore for MemoryStore {
    fn article(&self, id: ArticleId) -> QuillResult<Option<ArticleRecord>> {
        Ok(self.tables.read().articles.get(&id).cloned())
    }

    fn user(&self, id: UserId) -> QuillResult<Option<UserRecord>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    fn increment_views(&self, id: ArticleId) -> QuillResult<u64> {
        let mut tables = self.tables.write();
        let article = tables
            .articles
            .get_mut(&id)
            .ok_or(QuillError::ArticleNotFound(id))?;
        article.views_count += 1;
        Ok(article.views_count)
    }

    fn like_count(&self, id: ArticleId) -> QuillResult<u64> {
        let tables = self.tables.read();
        Ok(tables.likes.values().filter(|l| l.article_id == id).count() as u64)
    }

    fn approved_comment_count(&self, id: ArticleId) -> QuillResult<u64> {
        let tables = self.tables.read();
        Ok(tables
            .comments
            .values()
            .filter(|c| c.article_id == id && c.is_approved)
            .count() as u64)
    }

    fn set_editor_session(&self, id: ArticleId, session: &SessionToken) -> QuillResult<()> {
        let mut tables = self.tables.write();
        let article = tables
            .articles
            .get_mut(&id)
            .ok_or(QuillError::ArticleNotFound(id))?;
        article.editor_session_id = Some(session.clone());
        Ok(())
    }

    fn clear_editor_session_if(&self, id: ArticleId, expected: &SessionToken) -> QuillResult<bool> {
        let mut tables = self.tables.write();
        let Some(article) = tables.articles.get_mut(&id) else {
            return Ok(false);
        };
        if article.editor_session_id.as_ref() == Some(expected) {
            article.editor_session_id = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
