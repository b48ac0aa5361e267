//! Typed envelope builders, one per event kind
//!
//! Each builder addresses its event to the kind's primary channel. Missing
//! optional relations come out as `null`, never as placeholder text.

use chrono::{DateTime, Utc};
use quill_channel::ChannelName;
use quill_core::{
    format_timestamp, ArticleRecord, CategoryRecord, CommentRecord, LikeRecord, UserId,
    UserRecord,
};

use crate::{
    Action, ArticleData, AuthorRef, CategoryData, CommentData, EditingData, Event, EventData,
    LikeData, Metadata, UserSummary, ViewData,
};

fn metadata(at: &DateTime<Utc>, channel: ChannelName) -> Metadata {
    Metadata {
        timestamp: format_timestamp(at),
        channel,
        user_id: None,
    }
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        UserSummary {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name(),
        }
    }
}

impl Event {
    /// Comment created/updated/deleted; primary channel `article-{id}-comments`
    pub fn comment(comment: &CommentRecord, action: Action) -> Event {
        let data = CommentData {
            id: comment.id,
            article_id: comment.article_id,
            author: UserSummary::from(&comment.author),
            content: comment.content.clone(),
            parent_id: comment.parent_id,
            created_at: format_timestamp(&comment.created_at),
            updated_at: format_timestamp(&comment.updated_at),
            is_reply: comment.is_reply(),
        };
        Event::new(
            action,
            EventData::Comment(data),
            metadata(
                &comment.updated_at,
                ChannelName::article_comments(comment.article_id),
            ),
        )
    }

    /// Like created/deleted; primary channel `article-{id}-likes`
    pub fn like(like: &LikeRecord, action: Action) -> Event {
        let data = LikeData {
            id: like.id,
            article_id: like.article_id,
            user_id: like.user_id,
            created_at: format_timestamp(&like.created_at),
        };
        Event::new(
            action,
            EventData::Like(data),
            metadata(&like.created_at, ChannelName::article_likes(like.article_id)),
        )
    }

    /// View counter moved; primary channel `article-{id}-views`
    pub fn view(article: &ArticleRecord, views_count: u64) -> Event {
        let data = ViewData {
            article_id: article.id,
            views_count,
        };
        Event::new(
            Action::Incremented,
            EventData::View(data),
            metadata(&article.updated_at, ChannelName::article_views(article.id)),
        )
    }

    /// Article lifecycle; primary channel `article-{id}`
    pub fn article(article: &ArticleRecord, action: Action) -> Event {
        let data = ArticleData {
            id: article.id,
            title: article.title.clone(),
            slug: article.slug.clone(),
            status: article.status,
            author: AuthorRef {
                id: article.author.id,
                username: article.author.username.clone(),
            },
            category_id: article.category_id,
            reading_time: article.reading_time,
            views_count: article.views_count,
            created_at: format_timestamp(&article.created_at),
            updated_at: format_timestamp(&article.updated_at),
            published_at: article.published_at.as_ref().map(format_timestamp),
        };
        Event::new(
            action,
            EventData::Article(data),
            metadata(&article.updated_at, ChannelName::article(article.id)),
        )
    }

    /// Collaborative editing; primary channel `article-{id}-editing`
    pub fn editing(
        article: &ArticleRecord,
        user: &UserRecord,
        action: Action,
        cursor_position: Option<u64>,
    ) -> Event {
        let data = EditingData {
            article_id: article.id,
            user: UserSummary::from(user),
            cursor_position,
            session_id: article.editor_session_id.clone(),
            is_auto_saving: article.is_auto_saving,
        };
        Event::new(
            action,
            EventData::Editing(data),
            metadata(&article.last_saved_at, ChannelName::article_editing(article.id)),
        )
    }

    /// Category lifecycle; primary channel `category-{id}`
    pub fn category(category: &CategoryRecord, action: Action) -> Event {
        let data = CategoryData {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            created_at: format_timestamp(&category.created_at),
            updated_at: format_timestamp(&category.updated_at),
        };
        Event::new(
            action,
            EventData::Category(data),
            metadata(&category.updated_at, ChannelName::category(category.id)),
        )
    }

    /// Private notification; channel `user-{id}`
    pub fn notification(user: UserId, data: serde_json::Value, at: &DateTime<Utc>) -> Event {
        let mut meta = metadata(at, ChannelName::user(user));
        meta.user_id = Some(user);
        Event::new(Action::Created, EventData::Notification(data), meta)
    }

    /// Site-wide announcement; channel `global-announcements`
    pub fn announcement(data: serde_json::Value, at: &DateTime<Utc>) -> Event {
        Event::new(
            Action::Published,
            EventData::Announcement(data),
            metadata(at, ChannelName::GlobalAnnouncements),
        )
    }
}
