//! Subscription access control
//!
//! Rules are evaluated in order and the first match wins:
//! 1. Anonymous: never `-editing`; otherwise only `article-*`, `category-*`
//!    and the two global channels.
//! 2. `user-{id}`: only the user with that id.
//! 3. `*-editing`: the article's author or staff.
//! 4. Anything else: any authenticated user.

use std::sync::Arc;

use quill_core::{ArticleId, ArticleRecord, EntityStore, Principal, UserId};
use tracing::warn;

use crate::channel::parse_id;
use crate::{
    ChannelName, ARTICLE_PREFIX, CATEGORY_PREFIX, EDITING_MARKER, GLOBAL_ANNOUNCEMENTS,
    GLOBAL_NOTIFICATIONS, USER_PREFIX,
};

/// Channel prefixes open to anonymous principals
const PUBLIC_PREFIXES: [&str; 2] = [ARTICLE_PREFIX, CATEGORY_PREFIX];

/// Decides whether a principal may subscribe to a channel
#[derive(Clone)]
pub struct AccessPolicy {
    store: Arc<dyn EntityStore>,
}

impl AccessPolicy {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        AccessPolicy { store }
    }

    /// Check a raw channel string as requested by a client
    pub fn has_permission(&self, principal: &Principal, channel: &str) -> bool {
        let user = match principal {
            Principal::Anonymous => return anonymous_allowed(channel),
            Principal::User { id, .. } => *id,
        };

        if channel.starts_with(USER_PREFIX) {
            return embedded_id(channel).map(UserId) == Some(user);
        }

        if channel.contains(EDITING_MARKER) {
            let Some(article_id) = embedded_id(channel).map(ArticleId) else {
                return false;
            };
            return match self.store.article(article_id) {
                Ok(Some(article)) => can_edit(principal, &article),
                Ok(None) => false,
                Err(e) => {
                    warn!(%channel, error = %e, "article lookup failed, denying editing channel");
                    false
                }
            };
        }

        true
    }

    /// Check a canonical channel
    pub fn can_subscribe(&self, principal: &Principal, channel: &ChannelName) -> bool {
        self.has_permission(principal, &channel.to_string())
    }
}

/// Author or staff may edit an article
pub fn can_edit(principal: &Principal, article: &ArticleRecord) -> bool {
    match principal {
        Principal::Anonymous => false,
        Principal::User { id, .. } => article.is_authored_by(*id) || principal.is_staff(),
    }
}

fn anonymous_allowed(channel: &str) -> bool {
    if channel.contains(EDITING_MARKER) {
        return false;
    }
    PUBLIC_PREFIXES.iter().any(|p| channel.starts_with(p))
        || channel == GLOBAL_NOTIFICATIONS
        || channel == GLOBAL_ANNOUNCEMENTS
}

/// Second dash-delimited segment as an id (`user-5` -> 5, `article-7-editing` -> 7)
fn embedded_id(channel: &str) -> Option<u64> {
    channel.split('-').nth(1).and_then(parse_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use quill_core::{CategoryId, UserRecord};
    use quill_store::MemoryStore;

    fn policy_with_article() -> AccessPolicy {
        let store = MemoryStore::new();
        let author = UserRecord::new(UserId::new(1), "author");
        store.insert_user(author.clone());
        store.insert_user(UserRecord::new(UserId::new(2), "reader"));
        store.insert_article(ArticleRecord::new(ArticleId::new(10), author, Utc::now()));
        AccessPolicy::new(Arc::new(store))
    }

    #[test]
    fn test_authenticated_user_channels() {
        let policy = policy_with_article();
        let user = Principal::member(UserId::new(2));

        assert!(policy.has_permission(&user, "user-2"));
        assert!(!policy.has_permission(&user, "user-1"));
        assert!(!policy.has_permission(&user, "user-abc"));
        assert!(!policy.has_permission(&user, "user-"));
    }

    #[test]
    fn test_editing_channel_requires_author_or_staff() {
        let policy = policy_with_article();
        let author = Principal::member(UserId::new(1));
        let reader = Principal::member(UserId::new(2));
        let staff = Principal::staff(UserId::new(3));

        assert!(policy.has_permission(&author, "article-10-editing"));
        assert!(!policy.has_permission(&reader, "article-10-editing"));
        assert!(policy.has_permission(&staff, "article-10-editing"));

        // Unknown article and malformed ids deny
        assert!(!policy.has_permission(&staff, "article-99-editing"));
        assert!(!policy.has_permission(&staff, "article-x-editing"));
    }

    #[test]
    fn test_other_channels_open_to_authenticated() {
        let policy = policy_with_article();
        let reader = Principal::member(UserId::new(2));

        assert!(policy.has_permission(&reader, "article-10"));
        assert!(policy.has_permission(&reader, "article-10-comments"));
        assert!(policy.has_permission(&reader, "category-4"));
        assert!(policy.has_permission(&reader, "global-announcements"));
        assert!(policy.can_subscribe(&reader, &ChannelName::category(CategoryId::new(4))));
    }

    #[test]
    fn test_anonymous_channels() {
        let policy = policy_with_article();
        let anon = Principal::Anonymous;

        assert!(policy.has_permission(&anon, "article-10"));
        assert!(policy.has_permission(&anon, "article-10-views"));
        assert!(policy.has_permission(&anon, "category-2"));
        assert!(policy.has_permission(&anon, "global-notifications"));
        assert!(policy.has_permission(&anon, "global-announcements"));

        assert!(!policy.has_permission(&anon, "article-10-editing"));
        assert!(!policy.has_permission(&anon, "user-1"));
        assert!(!policy.has_permission(&anon, "global-other"));
        assert!(!policy.has_permission(&anon, "system"));
    }

    proptest! {
        #[test]
        fn prop_anonymous_never_gets_editing(prefix in "[a-z-]{0,12}", suffix in "[a-z0-9-]{0,12}") {
            let policy = policy_with_article();
            let channel = format!("{}-editing{}", prefix, suffix);
            prop_assert!(!policy.has_permission(&Principal::Anonymous, &channel));
        }

        #[test]
        fn prop_anonymous_never_gets_user_channels(id in any::<u64>()) {
            let policy = policy_with_article();
            let channel = ChannelName::user(UserId(id));
            prop_assert!(!policy.can_subscribe(&Principal::Anonymous, &channel));
        }

        #[test]
        fn prop_anonymous_allowlist(channel in "[a-z]{1,10}-[a-z0-9]{1,10}") {
            let policy = policy_with_article();
            let expected = !channel.contains("-editing")
                && (channel.starts_with("article-")
                    || channel.starts_with("category-")
                    || channel == "global-notifications"
                    || channel == "global-announcements");
            prop_assert_eq!(policy.has_permission(&Principal::Anonymous, &channel), expected);
        }

        #[test]
        fn prop_anonymous_public_articles(id in any::<u64>()) {
            let policy = policy_with_article();
            for channel in ChannelName::article_channels(ArticleId(id)) {
                prop_assert_eq!(
                    policy.can_subscribe(&Principal::Anonymous, &channel),
                    !channel.is_editing()
                );
            }
        }
    }
}
