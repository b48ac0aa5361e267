//! Event envelope definitions

use quill_channel::ChannelName;
use quill_core::{
    ArticleId, ArticleStatus, CategoryId, CommentId, LikeId, QuillError, QuillResult,
    SessionToken, UserId,
};
use serde::{Serialize, Serializer};

/// Domain event kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Comment,
    Like,
    View,
    Article,
    Editing,
    Notification,
    Announcement,
    Category,
}

impl EventType {
    /// Wire name, also used as the transport's event name
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Comment => "comment",
            EventType::Like => "like",
            EventType::View => "view",
            EventType::Article => "article",
            EventType::Editing => "editing",
            EventType::Notification => "notification",
            EventType::Announcement => "announcement",
            EventType::Category => "category",
        }
    }
}

/// What happened
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    Deleted,
    Published,
    Incremented,
    SessionStarted,
    CursorMoved,
    Heartbeat,
    SessionEnded,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Deleted => "deleted",
            Action::Published => "published",
            Action::Incremented => "incremented",
            Action::SessionStarted => "session_started",
            Action::CursorMoved => "cursor_moved",
            Action::Heartbeat => "heartbeat",
            Action::SessionEnded => "session_ended",
        }
    }
}

/// User as shown in comment and editing payloads
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
}

/// Author as shown in article payloads
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuthorRef {
    pub id: UserId,
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommentData {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub author: UserSummary,
    pub content: String,
    pub parent_id: Option<CommentId>,
    pub created_at: String,
    pub updated_at: String,
    pub is_reply: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LikeData {
    pub id: LikeId,
    pub article_id: ArticleId,
    pub user_id: UserId,
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewData {
    pub article_id: ArticleId,
    pub views_count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArticleData {
    pub id: ArticleId,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub status: ArticleStatus,
    pub author: AuthorRef,
    pub category_id: Option<CategoryId>,
    pub reading_time: u32,
    pub views_count: u64,
    pub created_at: String,
    pub updated_at: String,
    pub published_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EditingData {
    pub article_id: ArticleId,
    pub user: UserSummary,
    pub cursor_position: Option<u64>,
    pub session_id: Option<SessionToken>,
    pub is_auto_saving: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryData {
    pub id: CategoryId,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Event payload, one variant per event kind
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventData {
    Comment(CommentData),
    Like(LikeData),
    View(ViewData),
    Article(ArticleData),
    Editing(EditingData),
    Category(CategoryData),
    Notification(serde_json::Value),
    Announcement(serde_json::Value),
}

impl EventData {
    /// The kind is a property of the payload, so the two can never disagree
    pub fn event_type(&self) -> EventType {
        match self {
            EventData::Comment(_) => EventType::Comment,
            EventData::Like(_) => EventType::Like,
            EventData::View(_) => EventType::View,
            EventData::Article(_) => EventType::Article,
            EventData::Editing(_) => EventType::Editing,
            EventData::Category(_) => EventType::Category,
            EventData::Notification(_) => EventType::Notification,
            EventData::Announcement(_) => EventType::Announcement,
        }
    }
}

/// Envelope metadata
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metadata {
    pub timestamp: String,
    #[serde(serialize_with = "serialize_channel")]
    pub channel: ChannelName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

fn serialize_channel<S: Serializer>(channel: &ChannelName, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(channel)
}

/// The common envelope
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    event_type: EventType,
    action: Action,
    data: EventData,
    metadata: Metadata,
}

impl Event {
    pub(crate) fn new(action: Action, data: EventData, metadata: Metadata) -> Self {
        Event {
            event_type: data.event_type(),
            action,
            data,
            metadata,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Channel the event is (or will be) delivered to
    pub fn channel(&self) -> ChannelName {
        self.metadata.channel
    }

    /// Re-address the event; the publisher does this per destination
    pub fn set_channel(&mut self, channel: ChannelName) {
        self.metadata.channel = channel;
    }

    pub fn to_json(&self) -> QuillResult<String> {
        serde_json::to_string(self).map_err(|e| QuillError::Serialization(e.to_string()))
    }

    pub fn to_value(&self) -> QuillResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| QuillError::Serialization(e.to_string()))
    }
}
