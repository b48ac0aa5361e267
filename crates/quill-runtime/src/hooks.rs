//! Content hooks
//!
//! Domain code calls these after committing a mutation. They announce the
//! change and drop stale counters. Nothing in here can fail the caller:
//! every hook reports delivery as a bool and logs its own errors.

use std::sync::Arc;

use quill_core::{
    ArticleId, ArticleRecord, ArticleStatus, CategoryRecord, CommentRecord, LikeRecord,
};
use quill_events::{Action, Publisher};
use tracing::{error, info};

use crate::CounterManager;

/// Action for an article save given its status before the save
pub fn article_action(previous: Option<ArticleStatus>, current: ArticleStatus) -> Action {
    match previous {
        None => Action::Created,
        Some(prev) if prev != ArticleStatus::Published && current == ArticleStatus::Published => {
            Action::Published
        }
        Some(_) => Action::Updated,
    }
}

/// Mutation-to-event bridge
#[derive(Clone)]
pub struct ContentHooks {
    publisher: Arc<Publisher>,
    counters: CounterManager,
}

impl ContentHooks {
    pub fn new(publisher: Arc<Publisher>, counters: CounterManager) -> Self {
        ContentHooks {
            publisher,
            counters,
        }
    }

    /// `previous` is `None` for a newly created article
    pub fn article_saved(&self, article: &ArticleRecord, previous: Option<ArticleStatus>) -> bool {
        let action = article_action(previous, article.status);
        info!(
            article = article.id.get(),
            action = action.as_str(),
            status = article.status.as_str(),
            "article saved"
        );
        let delivered = self.publisher.publish_article(article, action);
        self.invalidate(article.id);
        delivered
    }

    pub fn article_deleted(&self, article: &ArticleRecord) -> bool {
        info!(article = article.id.get(), "article deleted");
        let delivered = self.publisher.publish_article(article, Action::Deleted);
        self.invalidate(article.id);
        delivered
    }

    pub fn comment_saved(&self, comment: &CommentRecord, created: bool) -> bool {
        let action = if created {
            Action::Created
        } else {
            Action::Updated
        };
        let delivered = self.publisher.publish_comment(comment, action);
        self.invalidate(comment.article_id);
        delivered
    }

    pub fn comment_deleted(&self, comment: &CommentRecord) -> bool {
        let delivered = self.publisher.publish_comment(comment, Action::Deleted);
        self.invalidate(comment.article_id);
        delivered
    }

    pub fn like_created(&self, like: &LikeRecord) -> bool {
        let delivered = self.publisher.publish_like(like, Action::Created);
        self.invalidate(like.article_id);
        delivered
    }

    pub fn like_deleted(&self, like: &LikeRecord) -> bool {
        let delivered = self.publisher.publish_like(like, Action::Deleted);
        self.invalidate(like.article_id);
        delivered
    }

    pub fn category_saved(&self, category: &CategoryRecord, created: bool) -> bool {
        let action = if created {
            Action::Created
        } else {
            Action::Updated
        };
        self.publisher.publish_category(category, action)
    }

    fn invalidate(&self, article: ArticleId) {
        if let Err(e) = self.counters.invalidate(article) {
            error!(article = article.get(), error = %e, "failed to invalidate counters");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_action() {
        use ArticleStatus::*;

        assert_eq!(article_action(None, Draft), Action::Created);
        assert_eq!(article_action(None, Published), Action::Created);
        assert_eq!(article_action(Some(Draft), Published), Action::Published);
        assert_eq!(article_action(Some(Archived), Published), Action::Published);
        assert_eq!(article_action(Some(Published), Published), Action::Updated);
        assert_eq!(article_action(Some(Draft), Draft), Action::Updated);
        assert_eq!(article_action(Some(Published), Archived), Action::Updated);
    }
}
