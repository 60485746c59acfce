// ── Runtime session configuration ──
//
// These types describe how a `Session` talks to the backend and caches
// results. They carry credential data and tuning but never touch config
// files; `tradewatch-config` builds a `SessionConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::query::{QueryClientConfig, QueryOptions};

/// Where persisted store slices live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// Nothing survives the process.
    #[default]
    Memory,
    /// One JSON file per slice in this directory.
    Directory(PathBuf),
}

/// Query cache tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub stale_time: Duration,
    /// Zero evicts an entry as soon as its last observer is dropped.
    pub gc_time: Duration,
    pub retry: u32,
    pub retry_delay: Duration,
    /// Wait after a successful mutation before invalidating, so the
    /// backend's read side can catch up.
    pub invalidation_delay: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            gc_time: Duration::from_secs(300),
            retry: 3,
            retry_delay: Duration::from_secs(1),
            invalidation_delay: Duration::from_secs(2),
        }
    }
}

impl CacheSettings {
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::default()
            .stale_time(self.stale_time)
            .retry(self.retry)
            .retry_delay(self.retry_delay)
    }

    pub fn client_config(&self) -> QueryClientConfig {
        QueryClientConfig {
            gc_time: self.gc_time,
        }
    }
}

/// Everything a [`Session`](crate::Session) needs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Backend API root (e.g. `https://api.tradewatch.example/`).
    pub base_url: Url,
    /// Bearer token to start with. Usually set later via sign-in.
    pub token: Option<SecretString>,
    /// Request timeout.
    pub timeout: Duration,
    pub cache: CacheSettings,
    pub storage: StorageBackend,
}

impl SessionConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            timeout: Duration::from_secs(30),
            cache: CacheSettings::default(),
            storage: StorageBackend::default(),
        }
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_storage(mut self, storage: StorageBackend) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_settings_translate_to_client_and_query_options() {
        let settings = CacheSettings {
            gc_time: Duration::from_secs(5),
            stale_time: Duration::from_secs(7),
            ..CacheSettings::default()
        };
        assert_eq!(settings.client_config().gc_time, Duration::from_secs(5));
        assert_eq!(settings.query_options().stale_time, Duration::from_secs(7));
    }
}
