//! Channel naming grammar

use std::fmt;
use std::str::FromStr;

use quill_core::{ArticleId, CategoryId, QuillError, QuillResult, UserId};

pub const USER_PREFIX: &str = "user-";
pub const ARTICLE_PREFIX: &str = "article-";
pub const CATEGORY_PREFIX: &str = "category-";
pub const GLOBAL_NOTIFICATIONS: &str = "global-notifications";
pub const GLOBAL_ANNOUNCEMENTS: &str = "global-announcements";
pub const EDITING_MARKER: &str = "-editing";

/// Sub-scope of an article channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Facet {
    Comments,
    Likes,
    Views,
    Editing,
}

impl Facet {
    pub const ALL: [Facet; 4] = [Facet::Comments, Facet::Likes, Facet::Views, Facet::Editing];

    pub fn as_str(self) -> &'static str {
        match self {
            Facet::Comments => "comments",
            Facet::Likes => "likes",
            Facet::Views => "views",
            Facet::Editing => "editing",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "comments" => Some(Facet::Comments),
            "likes" => Some(Facet::Likes),
            "views" => Some(Facet::Views),
            "editing" => Some(Facet::Editing),
            _ => None,
        }
    }
}

/// A canonical channel
///
/// Only constructible from typed ids (or by parsing a string that matches
/// the grammar exactly), so a channel can never carry free text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelName {
    User(UserId),
    Article(ArticleId),
    ArticleFacet(ArticleId, Facet),
    Category(CategoryId),
    GlobalNotifications,
    GlobalAnnouncements,
}

impl ChannelName {
    #[inline]
    pub fn user(id: UserId) -> Self {
        ChannelName::User(id)
    }

    #[inline]
    pub fn article(id: ArticleId) -> Self {
        ChannelName::Article(id)
    }

    #[inline]
    pub fn article_comments(id: ArticleId) -> Self {
        ChannelName::ArticleFacet(id, Facet::Comments)
    }

    #[inline]
    pub fn article_likes(id: ArticleId) -> Self {
        ChannelName::ArticleFacet(id, Facet::Likes)
    }

    #[inline]
    pub fn article_views(id: ArticleId) -> Self {
        ChannelName::ArticleFacet(id, Facet::Views)
    }

    #[inline]
    pub fn article_editing(id: ArticleId) -> Self {
        ChannelName::ArticleFacet(id, Facet::Editing)
    }

    #[inline]
    pub fn category(id: CategoryId) -> Self {
        ChannelName::Category(id)
    }

    /// Channels a signed-in user listens on by default
    pub fn user_channels(id: UserId) -> Vec<ChannelName> {
        vec![ChannelName::User(id), ChannelName::GlobalNotifications]
    }

    /// Every channel of an article: main, comments, likes, views, editing
    pub fn article_channels(id: ArticleId) -> Vec<ChannelName> {
        let mut channels = Vec::with_capacity(1 + Facet::ALL.len());
        channels.push(ChannelName::Article(id));
        channels.extend(Facet::ALL.iter().map(|f| ChannelName::ArticleFacet(id, *f)));
        channels
    }

    /// The numeric entity id embedded in the name, if any
    pub fn entity_id(&self) -> Option<u64> {
        match self {
            ChannelName::User(id) => Some(id.get()),
            ChannelName::Article(id) | ChannelName::ArticleFacet(id, _) => Some(id.get()),
            ChannelName::Category(id) => Some(id.get()),
            ChannelName::GlobalNotifications | ChannelName::GlobalAnnouncements => None,
        }
    }

    pub fn facet(&self) -> Option<Facet> {
        match self {
            ChannelName::ArticleFacet(_, facet) => Some(*facet),
            _ => None,
        }
    }

    #[inline]
    pub fn is_editing(&self) -> bool {
        self.facet() == Some(Facet::Editing)
    }

    #[inline]
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            ChannelName::GlobalNotifications | ChannelName::GlobalAnnouncements
        )
    }

    /// Parse a channel string; anything off-grammar is rejected
    pub fn parse(s: &str) -> QuillResult<Self> {
        let invalid = || QuillError::InvalidChannel(s.to_string());

        match s {
            GLOBAL_NOTIFICATIONS => return Ok(ChannelName::GlobalNotifications),
            GLOBAL_ANNOUNCEMENTS => return Ok(ChannelName::GlobalAnnouncements),
            _ => {}
        }

        if let Some(rest) = s.strip_prefix(USER_PREFIX) {
            return parse_id(rest).map(|id| ChannelName::User(UserId(id))).ok_or_else(invalid);
        }
        if let Some(rest) = s.strip_prefix(CATEGORY_PREFIX) {
            return parse_id(rest)
                .map(|id| ChannelName::Category(CategoryId(id)))
                .ok_or_else(invalid);
        }
        if let Some(rest) = s.strip_prefix(ARTICLE_PREFIX) {
            return match rest.split_once('-') {
                None => parse_id(rest).map(|id| ChannelName::Article(ArticleId(id))),
                Some((id, facet)) => parse_id(id)
                    .zip(Facet::from_str_opt(facet))
                    .map(|(id, facet)| ChannelName::ArticleFacet(ArticleId(id), facet)),
            }
            .ok_or_else(invalid);
        }

        Err(invalid())
    }
}

/// Strict decimal id: digits only, no sign, no leading zeros
pub(crate) fn parse_id(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelName::User(id) => write!(f, "{}{}", USER_PREFIX, id),
            ChannelName::Article(id) => write!(f, "{}{}", ARTICLE_PREFIX, id),
            ChannelName::ArticleFacet(id, facet) => {
                write!(f, "{}{}-{}", ARTICLE_PREFIX, id, facet.as_str())
            }
            ChannelName::Category(id) => write!(f, "{}{}", CATEGORY_PREFIX, id),
            ChannelName::GlobalNotifications => f.write_str(GLOBAL_NOTIFICATIONS),
            ChannelName::GlobalAnnouncements => f.write_str(GLOBAL_ANNOUNCEMENTS),
        }
    }
}

impl FromStr for ChannelName {
    type Err = QuillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelName::parse(s)
    }
}
