// ── Core error types ──
//
// Gateway failures are carried as `Arc<tradewatch_api::Error>` because the
// same error is shared by every observer of a cache entry. Everything else
// here is produced by the cache or the stores themselves.

use std::sync::Arc;

use thiserror::Error;

use crate::query::QueryKey;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Gateway ──────────────────────────────────────────────────────
    #[error(transparent)]
    Api(Arc<tradewatch_api::Error>),

    // ── Query cache ──────────────────────────────────────────────────
    /// The same key was used with two different payload types.
    #[error("Query key {key} already holds a different payload type")]
    KeyTypeMismatch { key: QueryKey },

    /// The entry was removed before it settled.
    #[error("Query {key} was removed from the cache")]
    Evicted { key: QueryKey },

    /// The query settled without data (disabled, or removed mid-flight).
    #[error("Query {key} has no data")]
    NoData { key: QueryKey },

    // ── Local storage ────────────────────────────────────────────────
    #[error("Storage error for '{key}': {message}")]
    Storage { key: String, message: String },
}

impl From<tradewatch_api::Error> for CoreError {
    fn from(err: tradewatch_api::Error) -> Self {
        Self::Api(Arc::new(err))
    }
}

impl From<Arc<tradewatch_api::Error>> for CoreError {
    fn from(err: Arc<tradewatch_api::Error>) -> Self {
        Self::Api(err)
    }
}

impl CoreError {
    /// The underlying gateway error, if this came from the backend.
    pub fn api_error(&self) -> Option<&tradewatch_api::Error> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}
