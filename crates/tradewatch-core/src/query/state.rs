// ── Cache entry state ──
//
// `Snapshot` is the type-erased state broadcast to observers through a
// `watch` channel. `QueryState<T>` is the typed view an observer hands
// out after downcasting the payload.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

/// Lifecycle of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum QueryStatus {
    /// Never fetched (e.g. created while disabled).
    Idle,
    /// A request is in flight. Previous data, if any, is still readable.
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub status: QueryStatus,
    pub data: Option<Erased>,
    pub error: Option<Arc<tradewatch_api::Error>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub fetched_at: Option<Instant>,
    pub invalidated: bool,
    pub generation: u64,
}

impl Snapshot {
    pub(crate) fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            updated_at: None,
            fetched_at: None,
            invalidated: false,
            generation: 0,
        }
    }

    pub(crate) fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    /// Stale when explicitly invalidated, never fetched, or older than `stale_time`.
    pub(crate) fn is_stale(&self, stale_time: Duration, now: Instant) -> bool {
        self.invalidated
            || self
                .fetched_at
                .is_none_or(|at| now.saturating_duration_since(at) >= stale_time)
    }
}

/// Point-in-time view of one query, as seen by an observer.
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    /// Last committed data. Kept while refetching and after a failed refetch.
    pub data: Option<Arc<T>>,
    pub error: Option<Arc<tradewatch_api::Error>>,
    /// Wall-clock time of the last successful commit.
    pub updated_at: Option<DateTime<Utc>>,
    pub is_stale: bool,
    /// Generation of the request that produced the current state.
    pub generation: u64,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
            is_stale: self.is_stale,
            generation: self.generation,
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    /// First load: pending with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.is_fetching() && self.data.is_none()
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

impl<T: Send + Sync + 'static> QueryState<T> {
    pub(crate) fn from_snapshot(snap: &Snapshot, stale_time: Duration) -> Self {
        Self {
            status: snap.status,
            data: snap
                .data
                .as_ref()
                .and_then(|d| Arc::clone(d).downcast::<T>().ok()),
            error: snap.error.clone(),
            updated_at: snap.updated_at,
            is_stale: snap.is_stale(stale_time, Instant::now()),
            generation: snap.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_fetched_is_stale() {
        let snap = Snapshot::idle();
        assert!(snap.is_stale(Duration::from_secs(60), Instant::now()));
        assert!(!snap.is_fetching());
    }

    #[test]
    fn fresh_until_stale_time_elapses() {
        let now = Instant::now();
        let snap = Snapshot {
            fetched_at: Some(now),
            status: QueryStatus::Success,
            ..Snapshot::idle()
        };
        assert!(!snap.is_stale(Duration::from_secs(10), now + Duration::from_secs(5)));
        assert!(snap.is_stale(Duration::from_secs(10), now + Duration::from_secs(10)));
    }

    #[test]
    fn invalidated_is_always_stale() {
        let now = Instant::now();
        let snap = Snapshot {
            fetched_at: Some(now),
            invalidated: true,
            ..Snapshot::idle()
        };
        assert!(snap.is_stale(Duration::from_secs(3600), now));
    }

    #[test]
    fn typed_view_downcasts_payload() {
        let snap = Snapshot {
            status: QueryStatus::Success,
            data: Some(Arc::new(vec![1_u32, 2, 3]) as Erased),
            ..Snapshot::idle()
        };
        let state: QueryState<Vec<u32>> = QueryState::from_snapshot(&snap, Duration::ZERO);
        assert_eq!(state.data.as_deref(), Some(&vec![1, 2, 3]));
        assert!(state.is_success());

        let wrong: QueryState<String> = QueryState::from_snapshot(&snap, Duration::ZERO);
        assert!(wrong.data.is_none());
    }
}
