//! Runtime configuration

use std::env;
use std::time::Duration;

use crate::{QuillError, QuillResult};

/// Quill realtime configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// Maximum live subscriptions attributed to one user
    pub max_connections_per_user: usize,
    /// Sliding TTL of a user's connection record
    pub connection_ttl: Duration,
    /// TTL of cached view/like/comment counters
    pub counter_cache_ttl: Duration,
    /// Editing sessions expire after this long without a heartbeat
    pub editing_session_timeout: Duration,
    /// Interval editing clients are told to heartbeat at
    pub heartbeat_interval: Duration,
    /// Buffered deliveries per channel in the in-process hub
    pub hub_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        RealtimeConfig {
            max_connections_per_user: 5,
            connection_ttl: Duration::from_secs(3600),
            counter_cache_ttl: Duration::from_secs(300),
            editing_session_timeout: Duration::from_secs(1800),
            heartbeat_interval: Duration::from_secs(30),
            hub_capacity: 256,
        }
    }
}

impl RealtimeConfig {
    /// Defaults overlaid with `QUILL_*` environment variables
    pub fn from_env() -> QuillResult<Self> {
        let mut config = RealtimeConfig::default();
        if let Some(v) = read_env("QUILL_MAX_CONNECTIONS_PER_USER")? {
            config.max_connections_per_user = v as usize;
        }
        if let Some(v) = read_env("QUILL_CONNECTION_TTL_SECS")? {
            config.connection_ttl = Duration::from_secs(v);
        }
        if let Some(v) = read_env("QUILL_COUNTER_CACHE_TTL_SECS")? {
            config.counter_cache_ttl = Duration::from_secs(v);
        }
        if let Some(v) = read_env("QUILL_EDITING_SESSION_TIMEOUT_SECS")? {
            config.editing_session_timeout = Duration::from_secs(v);
        }
        if let Some(v) = read_env("QUILL_HEARTBEAT_INTERVAL_SECS")? {
            config.heartbeat_interval = Duration::from_secs(v);
        }
        if let Some(v) = read_env("QUILL_HUB_CAPACITY")? {
            config.hub_capacity = v as usize;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections_per_user = max;
        self
    }

    pub fn with_connection_ttl(mut self, ttl: Duration) -> Self {
        self.connection_ttl = ttl;
        self
    }

    pub fn with_counter_cache_ttl(mut self, ttl: Duration) -> Self {
        self.counter_cache_ttl = ttl;
        self
    }

    pub fn with_editing_session_timeout(mut self, timeout: Duration) -> Self {
        self.editing_session_timeout = timeout;
        self
    }

    pub fn with_hub_capacity(mut self, capacity: usize) -> Self {
        self.hub_capacity = capacity;
        self
    }

    /// Reject limits and TTLs of zero
    pub fn validate(&self) -> QuillResult<()> {
        if self.max_connections_per_user == 0 {
            return Err(QuillError::Config(
                "max_connections_per_user must be at least 1".into(),
            ));
        }
        if self.hub_capacity == 0 {
            return Err(QuillError::Config("hub_capacity must be at least 1".into()));
        }
        for (name, ttl) in [
            ("connection_ttl", self.connection_ttl),
            ("counter_cache_ttl", self.counter_cache_ttl),
            ("editing_session_timeout", self.editing_session_timeout),
            ("heartbeat_interval", self.heartbeat_interval),
        ] {
            if ttl.is_zero() {
                return Err(QuillError::Config(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}

fn read_env(key: &str) -> QuillResult<Option<u64>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| QuillError::Config(format!("{}={:?}: {}", key, raw, e))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(QuillError::Config(format!("{}: {}", key, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RealtimeConfig::default();
        assert_eq!(config.max_connections_per_user, 5);
        assert_eq!(config.connection_ttl, Duration::from_secs(3600));
        assert_eq!(config.counter_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.editing_session_timeout, Duration::from_secs(1800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = RealtimeConfig::default().with_max_connections(0);
        assert!(matches!(config.validate(), Err(QuillError::Config(_))));

        let config = RealtimeConfig::default().with_counter_cache_ttl(Duration::ZERO);
        assert!(matches!(config.validate(), Err(QuillError::Config(_))));
    }

    #[test]
    fn test_from_env_overlays_and_rejects_garbage() {
        // Single test touches the environment to avoid cross-test races.
        env::set_var("QUILL_MAX_CONNECTIONS_PER_USER", "9");
        env::set_var("QUILL_COUNTER_CACHE_TTL_SECS", "60");
        let config = RealtimeConfig::from_env().unwrap();
        assert_eq!(config.max_connections_per_user, 9);
        assert_eq!(config.counter_cache_ttl, Duration::from_secs(60));

        env::set_var("QUILL_HUB_CAPACITY", "lots");
        assert!(matches!(
            RealtimeConfig::from_env(),
            Err(QuillError::Config(_))
        ));

        env::remove_var("QUILL_MAX_CONNECTIONS_PER_USER");
        env::remove_var("QUILL_COUNTER_CACHE_TTL_SECS");
        env::remove_var("QUILL_HUB_CAPACITY");
    }
}
