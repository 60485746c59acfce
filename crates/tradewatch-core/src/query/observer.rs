// ── Query observers ──
//
// A `QueryObserver<T>` is one subscription to a cache entry. It reads the
// entry's `watch` channel and unsubscribes on drop. Polling (when
// `refetch_interval` is set) runs as a task tied to the observer through a
// cancellation drop guard.

use std::marker::PhantomData;
use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::trace;

use super::client::{Inner, QueryClient};
use super::key::QueryKey;
use super::options::QueryOptions;
use super::state::{QueryState, Snapshot};

/// Live subscription to one query.
pub struct QueryObserver<T> {
    client: QueryClient,
    key: QueryKey,
    entry_id: u64,
    rx: watch::Receiver<Snapshot>,
    options: QueryOptions,
    enabled: bool,
    _poll: Option<DropGuard>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for QueryObserver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryObserver")
            .field("key", &self.key)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    pub(crate) fn new(
        client: QueryClient,
        key: QueryKey,
        entry_id: u64,
        rx: watch::Receiver<Snapshot>,
        options: QueryOptions,
    ) -> Self {
        let poll = options
            .refetch_interval
            .filter(|period| !period.is_zero())
            .map(|period| {
                let cancel = CancellationToken::new();
                tokio::spawn(poll_task(
                    client.downgrade(),
                    key.clone(),
                    entry_id,
                    period,
                    cancel.clone(),
                ));
                cancel.drop_guard()
            });

        Self {
            enabled: options.enabled,
            client,
            key,
            entry_id,
            rx,
            options,
            _poll: poll,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Current state of the entry.
    pub fn state(&self) -> QueryState<T> {
        QueryState::from_snapshot(&self.rx.borrow(), self.options.stale_time)
    }

    /// Latest committed data, if any.
    pub fn data(&self) -> Option<std::sync::Arc<T>> {
        self.state().data
    }

    /// Wait for the next transition. `None` once the entry has been removed.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.rx.changed().await.ok()?;
        Some(QueryState::from_snapshot(
            &self.rx.borrow_and_update(),
            self.options.stale_time,
        ))
    }

    /// Wait until no request is in flight and return that state.
    pub async fn wait_settled(&mut self) -> Option<QueryState<T>> {
        let stale_time = self.options.stale_time;
        let snapshot = self
            .rx
            .wait_for(|s| !s.is_fetching())
            .await
            .ok()
            .map(|s| (*s).clone())?;
        Some(QueryState::from_snapshot(&snapshot, stale_time))
    }

    /// Force a new request, superseding one already in flight.
    pub fn refetch(&self) -> bool {
        self.client.refetch(&self.key, self.entry_id)
    }

    /// Enable or disable this observer. Enabling fetches if the entry is stale.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.options.enabled = enabled;
        self.client
            .set_enabled(&self.key, self.entry_id, enabled, &self.options);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl<T> Drop for QueryObserver<T> {
    fn drop(&mut self) {
        self.client.release(&self.key, self.entry_id, self.enabled);
        trace!(key = %self.key, "observer detached");
    }
}

async fn poll_task(
    inner: Weak<Inner>,
    key: QueryKey,
    entry_id: u64,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the subscription already fetched.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                if !inner.poll(&key, entry_id) {
                    break;
                }
            }
        }
    }
    trace!(key = %key, "polling stopped");
}

/// Completion handle returned by [`QueryClient::invalidate`].
#[derive(Debug)]
pub struct Settled {
    receivers: Vec<watch::Receiver<Snapshot>>,
}

impl Settled {
    pub(crate) fn new(receivers: Vec<watch::Receiver<Snapshot>>) -> Self {
        Self { receivers }
    }

    /// Number of refetches the invalidation triggered.
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    /// Resolve once every triggered refetch has settled (or its entry was removed).
    pub async fn wait(self) {
        for mut rx in self.receivers {
            let settled = rx.wait_for(|s| !s.is_fetching()).await.is_ok();
            if !settled {
                trace!("entry removed before its refetch settled");
            }
        }
    }
}
