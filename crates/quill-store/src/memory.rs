//! In-memory cache backend
//!
//! One lock guards the whole keyspace, which makes every trait method atomic.
//! Expiry is lazy: an entry past its deadline is treated as absent and
//! purged the next time it is touched.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use quill_core::{expiry_after, Clock, QuillError, QuillResult, SystemClock};

use crate::{Cache, SetAdd};

#[derive(Clone, Debug)]
enum Value {
    Scalar(String),
    Set(BTreeSet<String>),
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: DateTime<Utc>,
}

impl Entry {
    #[inline]
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// TTL cache held in process memory
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        MemoryCache {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Live entries (expired ones are purged first)
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        entries.retain(|_, e| e.is_live(now));
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining lifetime of a live entry
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| (e.expires_at - now).to_std().ok())
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch a live entry, purging it if expired
fn live<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: DateTime<Utc>,
) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|e| !e.is_live(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

fn wrong_type(key: &str) -> QuillError {
    QuillError::Cache(format!("wrong value type at key {}", key))
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> QuillResult<Option<String>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match live(&mut entries, key, now) {
            None => Ok(None),
            Some(Entry {
                value: Value::Scalar(v),
                ..
            }) => Ok(Some(v.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> QuillResult<()> {
        let now = self.clock.now();
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value.to_string()),
                expires_at: expiry_after(now, ttl),
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> QuillResult<bool> {
        let now = self.clock.now();
        let removed = self.entries.lock().remove(key);
        Ok(removed.is_some_and(|e| e.is_live(now)))
    }

    fn delete_many(&self, keys: &[String]) -> QuillResult<usize> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        Ok(keys
            .iter()
            .filter_map(|k| entries.remove(k))
            .filter(|e| e.is_live(now))
            .count())
    }

    fn keys_with_prefix(&self, prefix: &str) -> QuillResult<Vec<String>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        entries.retain(|_, e| e.is_live(now));
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn expire(&self, key: &str, ttl: Duration) -> QuillResult<bool> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        Ok(match live(&mut entries, key, now) {
            Some(entry) => {
                entry.expires_at = expiry_after(now, ttl);
                true
            }
            None => false,
        })
    }

    fn set_add_bounded(
        &self,
        key: &str,
        member: &str,
        max: usize,
        ttl: Duration,
    ) -> QuillResult<SetAdd> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expires_at = expiry_after(now, ttl);

        match live(&mut entries, key, now) {
            Some(Entry {
                value: Value::Set(members),
                expires_at: entry_expiry,
            }) => {
                if members.len() >= max {
                    return Ok(SetAdd::Full(members.len()));
                }
                let inserted = members.insert(member.to_string());
                *entry_expiry = expires_at;
                Ok(SetAdd::Added {
                    count: members.len(),
                    inserted,
                })
            }
            Some(_) => Err(wrong_type(key)),
            None => {
                if max == 0 {
                    return Ok(SetAdd::Full(0));
                }
                let mut members = BTreeSet::new();
                members.insert(member.to_string());
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Set(members),
                        expires_at,
                    },
                );
                Ok(SetAdd::Added {
                    count: 1,
                    inserted: true,
                })
            }
        }
    }

    fn set_remove(&self, key: &str, member: &str, ttl: Duration) -> QuillResult<usize> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let remaining = match live(&mut entries, key, now) {
            None => return Ok(0),
            Some(Entry {
                value: Value::Set(members),
                expires_at,
            }) => {
                members.remove(member);
                *expires_at = expiry_after(now, ttl);
                members.len()
            }
            Some(_) => return Err(wrong_type(key)),
        };

        if remaining == 0 {
            entries.remove(key);
        }
        Ok(remaining)
    }

    fn set_members(&self, key: &str) -> QuillResult<Vec<String>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match live(&mut entries, key, now) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheExt;
    use quill_core::ManualClock;

    const MINUTE: Duration = Duration::from_secs(60);

    fn cache() -> (Arc<ManualClock>, MemoryCache) {
        let clock = Arc::new(ManualClock::default());
        let cache = MemoryCache::with_clock(clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_get_set_expire() {
        let (clock, cache) = cache();
        cache.set("k", "v", MINUTE).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));

        clock.advance(Duration::from_secs(59));
        assert!(cache.get("k").unwrap().is_some());

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("k").unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expire_refreshes_only_live_entries() {
        let (clock, cache) = cache();
        cache.set("k", "v", MINUTE).unwrap();
        clock.advance(Duration::from_secs(50));
        assert!(cache.expire("k", MINUTE).unwrap());
        clock.advance(Duration::from_secs(50));
        assert!(cache.get("k").unwrap().is_some());

        clock.advance(MINUTE);
        assert!(!cache.expire("k", MINUTE).unwrap());
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn test_delete_many_counts_live_only() {
        let (clock, cache) = cache();
        cache.set("a", "1", MINUTE).unwrap();
        cache.set("b", "2", Duration::from_secs(1)).unwrap();
        clock.advance(Duration::from_secs(2));

        let removed = cache
            .delete_many(&["a".to_string(), "b".to_string(), "c".to_string()])
            .unwrap();
        assert_eq!(removed, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_with_prefix_skips_expired() {
        let (clock, cache) = cache();
        cache.set("editing_session:1:1", "x", MINUTE).unwrap();
        cache.set("editing_session:1:2", "x", Duration::from_secs(5)).unwrap();
        cache.set("editing_session:12:1", "x", MINUTE).unwrap();
        clock.advance(Duration::from_secs(10));

        let keys = cache.keys_with_prefix("editing_session:1:").unwrap();
        assert_eq!(keys, vec!["editing_session:1:1".to_string()]);
    }

    #[test]
    fn test_bounded_set() {
        let (_, cache) = cache();
        let added = |count, inserted| SetAdd::Added { count, inserted };
        assert_eq!(cache.set_add_bounded("s", "a", 2, MINUTE).unwrap(), added(1, true));
        assert_eq!(cache.set_add_bounded("s", "a", 2, MINUTE).unwrap(), added(1, false));
        assert_eq!(cache.set_add_bounded("s", "b", 2, MINUTE).unwrap(), added(2, true));
        assert_eq!(cache.set_add_bounded("s", "c", 2, MINUTE).unwrap(), SetAdd::Full(2));
        assert_eq!(cache.set_members("s").unwrap(), vec!["a", "b"]);

        assert_eq!(cache.set_remove("s", "a", MINUTE).unwrap(), 1);
        assert_eq!(cache.set_remove("s", "b", MINUTE).unwrap(), 0);
        // Empty sets are deleted, not stored
        assert!(cache.is_empty());
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        let (_, cache) = cache();
        cache.set("k", "v", MINUTE).unwrap();
        assert!(cache.set_add_bounded("k", "m", 5, MINUTE).is_err());
        assert!(cache.set_members("k").is_err());
    }

    #[test]
    fn test_json_helpers() {
        let (_, cache) = cache();
        cache.set_json("n", &42u64, MINUTE).unwrap();
        assert_eq!(cache.get_json::<u64>("n").unwrap(), Some(42));
        assert_eq!(cache.get_json::<u64>("missing").unwrap(), None);

        cache.set("bad", "not json", MINUTE).unwrap();
        assert!(cache.get_json::<u64>("bad").is_err());
    }

    #[test]
    fn test_ttl_reports_remaining() {
        let (clock, cache) = cache();
        cache.set("k", "v", MINUTE).unwrap();
        clock.advance(Duration::from_secs(20));
        assert_eq!(cache.ttl("k"), Some(Duration::from_secs(40)));
        assert_eq!(cache.ttl("missing"), None);
    }
}
