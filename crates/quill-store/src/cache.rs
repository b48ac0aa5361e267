//! Cache interface

use std::time::Duration;

use quill_core::{QuillError, QuillResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Outcome of a bounded set insert
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetAdd {
    /// Member stored; set now has `count` members. `inserted` is false when
    /// the member was already present.
    Added { count: usize, inserted: bool },
    /// Set already at the bound; nothing written
    Full(usize),
}

/// Ephemeral key-value cache with per-entry expiry.
///
/// Expired entries behave exactly like absent ones. Every method is a single
/// atomic operation at the cache; callers never get a read-then-write pair
/// from one call.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> QuillResult<Option<String>>;

    /// Store a scalar value, replacing whatever was there
    fn set(&self, key: &str, value: &str, ttl: Duration) -> QuillResult<()>;

    /// Returns whether a live entry was removed
    fn delete(&self, key: &str) -> QuillResult<bool>;

    /// Returns how many live entries were removed
    fn delete_many(&self, keys: &[String]) -> QuillResult<usize>;

    /// Live keys starting with `prefix`
    fn keys_with_prefix(&self, prefix: &str) -> QuillResult<Vec<String>>;

    /// Reset the TTL of a live entry. Returns false if absent or expired.
    fn expire(&self, key: &str, ttl: Duration) -> QuillResult<bool>;

    /// Add `member` to the set at `key` unless the set already holds `max`
    /// members, refreshing the TTL on success.
    fn set_add_bounded(&self, key: &str, member: &str, max: usize, ttl: Duration)
        -> QuillResult<SetAdd>;

    /// Remove `member` from the set at `key`; the key is deleted when the set
    /// empties, otherwise its TTL is refreshed. Returns remaining size.
    fn set_remove(&self, key: &str, member: &str, ttl: Duration) -> QuillResult<usize>;

    fn set_members(&self, key: &str) -> QuillResult<Vec<String>>;
}

/// Typed JSON helpers over any [`Cache`]
pub trait CacheExt: Cache {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> QuillResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| QuillError::Serialization(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> QuillResult<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| QuillError::Serialization(format!("{}: {}", key, e)))?;
        self.set(key, &raw, ttl)
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
