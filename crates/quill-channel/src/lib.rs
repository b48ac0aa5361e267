//! Quill Channels - Where events go and who may listen
//!
//! Channel names follow a dash-delimited grammar derived only from entity
//! ids and a fixed facet vocabulary:
//!
//! - `user-{id}` - private per-user channel
//! - `article-{id}` and `article-{id}-{comments|likes|views|editing}`
//! - `category-{id}`
//! - `global-notifications`, `global-announcements`
//!
//! Access control decides subscriptions; it never mutates state.

pub mod channel;
pub mod access;

pub use channel::*;
pub use access::*;
