// ── Query client ──
//
// Keyed cache of asynchronous fetch results. Each key owns one `watch`
// channel (observers), a monotonically increasing request generation and
// at most one in-flight task. The entry map sits behind a single mutex
// that is never held across an `.await`; every transition happens inside
// one critical section, so observers never see a half-applied entry.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::key::{KeyFilter, QueryKey};
use super::observer::{QueryObserver, Settled};
use super::options::{InvalidateOptions, MutationOptions, QueryClientConfig, QueryOptions};
use super::state::{Erased, QueryStatus, Snapshot};
use crate::error::CoreError;

type FetchFuture = Pin<Box<dyn Future<Output = Result<Erased, tradewatch_api::Error>> + Send>>;
type Fetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, Default)]
struct RetryPolicy {
    retry: u32,
    retry_delay: Duration,
}

impl From<&QueryOptions> for RetryPolicy {
    fn from(options: &QueryOptions) -> Self {
        Self {
            retry: options.retry,
            retry_delay: options.retry_delay,
        }
    }
}

struct InFlight {
    generation: u64,
    abort: AbortHandle,
}

pub(crate) struct Entry {
    /// Distinguishes a re-created entry from an evicted one under the same key.
    id: u64,
    tx: watch::Sender<Snapshot>,
    type_id: TypeId,
    /// Generation of the most recently issued request (or optimistic write).
    issued: u64,
    in_flight: Option<InFlight>,
    observers: usize,
    enabled_observers: usize,
    /// Last registered fetcher; observers of one key share it.
    fetcher: Option<Fetcher>,
    retry: RetryPolicy,
    /// Bumped whenever a pending eviction must be called off.
    gc_epoch: u64,
}

impl Entry {
    fn new(id: u64, type_id: TypeId) -> Self {
        let (tx, _) = watch::channel(Snapshot::idle());
        Self {
            id,
            tx,
            type_id,
            issued: 0,
            in_flight: None,
            observers: 0,
            enabled_observers: 0,
            fetcher: None,
            retry: RetryPolicy::default(),
            gc_epoch: 0,
        }
    }
}

impl Drop for Entry {
    // An entry leaving the map takes its request with it, so a later
    // subscription under the same key never runs alongside it.
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.abort.abort();
            trace!(generation = in_flight.generation, "aborted request of dropped entry");
        }
    }
}

pub(crate) struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    next_generation: AtomicU64,
    config: QueryClientConfig,
}

/// Process-wide query cache handle.
///
/// Cheaply cloneable via `Arc<Inner>`. Must be used from within a tokio
/// runtime: subscribing spawns the fetch task.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryClientConfig::default())
    }
}

impl QueryClient {
    pub fn new(config: QueryClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                config,
            }),
        }
    }

    pub fn config(&self) -> &QueryClientConfig {
        &self.inner.config
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Subscribe to `key`, fetching with `fetch` when the entry is missing
    /// or stale. A subscription made while a request is in flight attaches
    /// to that request.
    pub fn observe<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetch: F,
    ) -> Result<QueryObserver<T>, CoreError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, tradewatch_api::Error>> + Send + 'static,
    {
        let fetcher: Fetcher = Arc::new(move || {
            let fut = fetch();
            Box::pin(async move { fut.await.map(|data| Arc::new(data) as Erased) })
        });

        let (entry_id, rx) = {
            let mut entries = self.inner.lock();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| self.inner.new_entry(TypeId::of::<T>()));
            if entry.type_id != TypeId::of::<T>() {
                return Err(CoreError::KeyTypeMismatch { key });
            }

            entry.observers += 1;
            if options.enabled {
                entry.enabled_observers += 1;
            }
            entry.gc_epoch += 1;
            entry.fetcher = Some(fetcher);
            entry.retry = RetryPolicy::from(&options);

            if options.enabled && entry.in_flight.is_none() {
                let needs_fetch = options.refetch_on_subscribe
                    || entry.tx.borrow().is_stale(options.stale_time, Instant::now());
                if needs_fetch {
                    self.inner.spawn_fetch(&key, entry);
                }
            }
            (entry.id, entry.tx.subscribe())
        };

        trace!(key = %key, "observer attached");
        Ok(QueryObserver::new(self.clone(), key, entry_id, rx, options))
    }

    /// Observe `key` until it settles and return its data.
    ///
    /// Fresh cached data is returned without a request.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetch: F,
    ) -> Result<Arc<T>, CoreError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, tradewatch_api::Error>> + Send + 'static,
    {
        let mut observer = self.observe(key.clone(), options, fetch)?;
        let state = observer
            .wait_settled()
            .await
            .ok_or_else(|| CoreError::Evicted { key: key.clone() })?;

        match (state.status, state.error, state.data) {
            (QueryStatus::Error, Some(err), _) => Err(CoreError::Api(err)),
            (_, _, Some(data)) => Ok(data),
            _ => Err(CoreError::NoData { key }),
        }
    }

    // ── Direct cache access ──────────────────────────────────────────

    /// Committed data for `key`, if any and of type `T`.
    pub fn get_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entries = self.inner.lock();
        let entry = entries.get(key)?;
        let data = entry.tx.borrow().data.clone()?;
        data.downcast::<T>().ok()
    }

    /// Optimistically commit `value` for `key`.
    ///
    /// Counts as a new generation: any in-flight request for the key is
    /// aborted and its response, should it still arrive, is discarded.
    pub fn set_data<T: Send + Sync + 'static>(
        &self,
        key: QueryKey,
        value: T,
    ) -> Result<(), CoreError> {
        let mut entries = self.inner.lock();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| self.inner.new_entry(TypeId::of::<T>()));
        if entry.type_id != TypeId::of::<T>() {
            return Err(CoreError::KeyTypeMismatch { key });
        }

        if let Some(prev) = entry.in_flight.take() {
            prev.abort.abort();
        }
        let generation = self.inner.issue(entry);
        let data = Arc::new(value) as Erased;
        entry.tx.send_modify(|s| {
            s.status = QueryStatus::Success;
            s.data = Some(data);
            s.error = None;
            s.updated_at = Some(Utc::now());
            s.fetched_at = Some(Instant::now());
            s.invalidated = false;
            s.generation = generation;
        });
        debug!(key = %key, generation, "optimistic data committed");

        if entry.observers == 0 && self.inner.schedule_gc(&key, entry) {
            entries.remove(&key);
        }
        Ok(())
    }

    /// Apply `f` to the committed data of `key`, if present.
    ///
    /// Returns `Ok(false)` when there is nothing to update.
    pub fn update_data<T, F>(&self, key: &QueryKey, f: F) -> Result<bool, CoreError>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&T) -> T,
    {
        let Some(current) = self.get_data::<T>(key) else {
            return Ok(false);
        };
        self.set_data(key.clone(), f(&current))?;
        Ok(true)
    }

    /// Drop every matching entry. Observers of a removed entry see
    /// `changed()` return `None`; in-flight requests are aborted.
    pub fn remove(&self, filter: &KeyFilter) -> usize {
        let mut entries = self.inner.lock();
        let before = entries.len();
        entries.retain(|key, _| !filter.matches(key));
        let removed = before - entries.len();
        debug!(?filter, removed, "removed queries");
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.lock().contains_key(key)
    }

    // ── Invalidation ─────────────────────────────────────────────────

    /// Mark every matching entry stale and refetch those with active,
    /// enabled observers. Entries without observers refetch on their next
    /// subscription. Await the returned [`Settled`] to wait for the
    /// refetches.
    pub fn invalidate(&self, filter: &KeyFilter) -> Settled {
        let mut receivers = Vec::new();
        let mut matched = 0_usize;
        {
            let mut entries = self.inner.lock();
            for (key, entry) in entries.iter_mut() {
                if !filter.matches(key) {
                    continue;
                }
                matched += 1;
                entry.tx.send_modify(|s| s.invalidated = true);
                if entry.enabled_observers > 0 && self.inner.spawn_fetch(key, entry) {
                    receivers.push(entry.tx.subscribe());
                }
            }
        }
        debug!(?filter, matched, refetching = receivers.len(), "invalidated queries");
        Settled::new(receivers)
    }

    /// [`invalidate`](Self::invalidate) after an optional delay, then call
    /// `on_complete` once the triggered refetches have settled.
    pub fn invalidate_with(&self, filter: KeyFilter, options: InvalidateOptions) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            if let Some(delay) = options.delay {
                tokio::time::sleep(delay).await;
            }
            client.invalidate(&filter).wait().await;
            if let Some(on_complete) = options.on_complete {
                on_complete();
            }
        })
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Run a gateway write, then invalidate `options.invalidate` on success.
    ///
    /// With a zero delay the invalidation happens before this returns;
    /// otherwise it is scheduled in the background.
    pub async fn mutate<T, Fut>(&self, mutation: Fut, options: MutationOptions) -> Result<T, CoreError>
    where
        Fut: Future<Output = Result<T, tradewatch_api::Error>>,
    {
        let output = mutation.await?;
        for filter in options.invalidate {
            if options.delay.is_zero() {
                drop(self.invalidate(&filter));
            } else {
                drop(self.invalidate_with(filter, InvalidateOptions::default().delay(options.delay)));
            }
        }
        Ok(output)
    }

    // ── Observer plumbing ────────────────────────────────────────────

    pub(crate) fn refetch(&self, key: &QueryKey, entry_id: u64) -> bool {
        let mut entries = self.inner.lock();
        entries
            .get_mut(key)
            .filter(|entry| entry.id == entry_id)
            .is_some_and(|entry| self.inner.spawn_fetch(key, entry))
    }

    pub(crate) fn set_enabled(
        &self,
        key: &QueryKey,
        entry_id: u64,
        enabled: bool,
        options: &QueryOptions,
    ) {
        let mut entries = self.inner.lock();
        let Some(entry) = entries.get_mut(key).filter(|e| e.id == entry_id) else {
            return;
        };
        if enabled {
            entry.enabled_observers += 1;
            let stale = entry.tx.borrow().is_stale(options.stale_time, Instant::now());
            if entry.in_flight.is_none() && stale {
                self.inner.spawn_fetch(key, entry);
            }
        } else {
            entry.enabled_observers = entry.enabled_observers.saturating_sub(1);
        }
    }

    pub(crate) fn release(&self, key: &QueryKey, entry_id: u64, was_enabled: bool) {
        let mut entries = self.inner.lock();
        let Some(entry) = entries.get_mut(key).filter(|e| e.id == entry_id) else {
            return;
        };
        entry.observers = entry.observers.saturating_sub(1);
        if was_enabled {
            entry.enabled_observers = entry.enabled_observers.saturating_sub(1);
        }
        if entry.observers == 0 && self.inner.schedule_gc(key, entry) {
            entries.remove(key);
            trace!(key = %key, "evicted unobserved query");
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn new_entry(&self, type_id: TypeId) -> Entry {
        Entry::new(self.next_generation.fetch_add(1, Ordering::Relaxed) + 1, type_id)
    }

    /// Allocate the next generation and make it the latest for `entry`.
    fn issue(&self, entry: &mut Entry) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        entry.issued = generation;
        generation
    }

    /// Start a request for `key`, superseding any request in flight.
    /// Returns `false` if the entry has no fetcher yet.
    fn spawn_fetch(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry) -> bool {
        let Some(fetcher) = entry.fetcher.clone() else {
            return false;
        };
        if let Some(prev) = entry.in_flight.take() {
            prev.abort.abort();
            debug!(key = %key, superseded = prev.generation, "superseding in-flight request");
        }

        let generation = self.issue(entry);
        entry.tx.send_modify(|s| s.status = QueryStatus::Pending);

        let weak = Arc::downgrade(self);
        let task_key = key.clone();
        let retry = entry.retry;
        let handle = tokio::spawn(async move {
            let result = run_with_retry(&task_key, fetcher.as_ref(), retry).await;
            if let Some(inner) = weak.upgrade() {
                inner.commit(&task_key, generation, result);
            }
        });
        entry.in_flight = Some(InFlight {
            generation,
            abort: handle.abort_handle(),
        });
        trace!(key = %key, generation, "request issued");
        true
    }

    /// Apply a settled response if it belongs to the latest generation.
    fn commit(&self, key: &QueryKey, generation: u64, result: Result<Erased, tradewatch_api::Error>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            debug!(key = %key, generation, "response for evicted query dropped");
            return;
        };
        if entry.issued != generation {
            debug!(
                key = %key,
                generation,
                latest = entry.issued,
                "discarding out-of-date response"
            );
            return;
        }

        entry.in_flight = None;
        match result {
            Ok(data) => {
                entry.tx.send_modify(|s| {
                    s.status = QueryStatus::Success;
                    s.data = Some(data);
                    s.error = None;
                    s.updated_at = Some(Utc::now());
                    s.fetched_at = Some(Instant::now());
                    s.invalidated = false;
                    s.generation = generation;
                });
                trace!(key = %key, generation, "query succeeded");
            }
            Err(err) => {
                warn!(key = %key, generation, error = %err, "query failed");
                let err = Arc::new(err);
                entry.tx.send_modify(|s| {
                    s.status = QueryStatus::Error;
                    s.error = Some(err);
                    s.generation = generation;
                });
            }
        }
    }

    /// Poll tick: refetch unless disabled or already in flight. Returns
    /// `false` once the polled entry is gone, even if `key` was reused.
    pub(crate) fn poll(self: &Arc<Self>, key: &QueryKey, entry_id: u64) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key).filter(|e| e.id == entry_id) else {
            return false;
        };
        if entry.enabled_observers > 0 && entry.in_flight.is_none() {
            self.spawn_fetch(key, entry);
        }
        true
    }

    /// Arrange eviction of an unobserved entry. Returns `true` when the
    /// caller should evict right away (zero `gc_time` or no runtime).
    fn schedule_gc(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry) -> bool {
        let gc_time = self.config.gc_time;
        if gc_time.is_zero() {
            return true;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return true;
        };

        entry.gc_epoch += 1;
        let epoch = entry.gc_epoch;
        let weak = Arc::downgrade(self);
        let key = key.clone();
        runtime.spawn(async move {
            tokio::time::sleep(gc_time).await;
            if let Some(inner) = weak.upgrade() {
                inner.collect(&key, epoch);
            }
        });
        false
    }

    fn collect(&self, key: &QueryKey, epoch: u64) {
        let mut entries = self.lock();
        let expired = entries
            .get(key)
            .is_some_and(|e| e.observers == 0 && e.gc_epoch == epoch);
        if expired {
            entries.remove(key);
            trace!(key = %key, "garbage-collected query");
        }
    }
}

async fn run_with_retry(
    key: &QueryKey,
    fetcher: &(dyn Fn() -> FetchFuture + Send + Sync),
    policy: RetryPolicy,
) -> Result<Erased, tradewatch_api::Error> {
    let mut attempt = 0_u32;
    loop {
        match fetcher().await {
            Ok(data) => return Ok(data),
            Err(err) if attempt < policy.retry && err.is_transient() => {
                attempt += 1;
                debug!(key = %key, attempt, error = %err, "retrying query");
                if !policy.retry_delay.is_zero() {
                    tokio::time::sleep(policy.retry_delay).await;
                }
            }
            Err(err) => return Err(err),
        }
    }
}
