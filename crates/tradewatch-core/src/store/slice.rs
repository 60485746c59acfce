// ── Store slices ──
//
// A `Store<S>` is one named piece of client state behind a `watch`
// channel. Every mutation replaces the `Arc<S>` snapshot and notifies
// subscribers; persisted stores also write a versioned JSON envelope to
// their `Storage` first. Mutations are serialized by a writer lock that
// readers never take.

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_core::Stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use super::storage::Storage;

/// Storage key prefix for persisted slices.
pub const STORAGE_PREFIX: &str = "tradewatch:";

/// State that can be written to and restored from durable storage.
///
/// `Snapshot` may be the state itself or a whitelisted subset of it.
/// Bump `VERSION` when the snapshot shape changes; stored envelopes with
/// another version are discarded on load.
pub trait Persist: Send + Sync + Sized + 'static {
    type Snapshot: Serialize + DeserializeOwned;

    const VERSION: u32 = 0;

    fn snapshot(&self) -> Self::Snapshot;

    /// Rebuild state from a stored snapshot, filling the rest from `default`.
    fn restore(default: Self, snapshot: Self::Snapshot) -> Self;
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    version: u32,
}

fn encode<S: Persist>(state: &S) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Envelope {
        state: state.snapshot(),
        version: S::VERSION,
    })
}

struct Persistence<S> {
    storage: Arc<dyn Storage>,
    key: String,
    encode: fn(&S) -> Result<String, serde_json::Error>,
}

impl<S> Persistence<S> {
    fn write(&self, state: &S) {
        let raw = match (self.encode)(state) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to serialize store state");
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.key, &raw) {
            warn!(key = %self.key, error = %e, "failed to persist store state");
        }
    }
}

struct StoreInner<S> {
    name: String,
    tx: watch::Sender<Arc<S>>,
    writer: Mutex<()>,
    persistence: Option<Persistence<S>>,
}

/// Handle to one state slice. Clones share the same state.
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("persisted", &self.inner.persistence.is_some())
            .field("state", &*self.inner.tx.borrow())
            .finish()
    }
}

impl<S: Send + Sync + 'static> Store<S> {
    /// In-memory slice, reset on every start.
    pub fn volatile(name: impl Into<String>, initial: S) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self {
            inner: Arc::new(StoreInner {
                name: name.into(),
                tx,
                writer: Mutex::new(()),
                persistence: None,
            }),
        }
    }

    /// Slice rehydrated from `storage` under `tradewatch:<name>`.
    ///
    /// Missing, malformed or version-mismatched data yields `default`.
    pub fn persisted(name: impl Into<String>, storage: Arc<dyn Storage>, default: S) -> Self
    where
        S: Persist,
    {
        let name = name.into();
        let key = format!("{STORAGE_PREFIX}{name}");
        let initial = rehydrate(storage.as_ref(), &key, default);
        let (tx, _) = watch::channel(Arc::new(initial));
        Self {
            inner: Arc::new(StoreInner {
                name,
                tx,
                writer: Mutex::new(()),
                persistence: Some(Persistence {
                    storage,
                    key,
                    encode: encode::<S>,
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_persisted(&self) -> bool {
        self.inner.persistence.is_some()
    }

    /// Current state snapshot.
    pub fn get_state(&self) -> Arc<S> {
        self.inner.tx.borrow().clone()
    }

    /// Replace the state with `updater(&current)`.
    ///
    /// The updater may read this store but must not mutate it.
    pub fn set_state(&self, updater: impl FnOnce(&S) -> S) {
        let _writer = self.inner.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(updater(&self.get_state()));
        self.commit(next);
    }

    /// Mutate a copy of the state in place.
    ///
    /// The closure may read this store but must not mutate it.
    pub fn update(&self, f: impl FnOnce(&mut S))
    where
        S: Clone,
    {
        let _writer = self.inner.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.get_state();
        f(Arc::make_mut(&mut next));
        self.commit(next);
    }

    /// Replace the state outright.
    pub fn replace(&self, state: S) {
        self.set_state(|_| state);
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> StateStream<S> {
        StateStream::new(self.inner.tx.subscribe())
    }

    /// Delete the persisted copy. The in-memory state is left as is.
    pub fn clear_persisted(&self) {
        if let Some(p) = &self.inner.persistence {
            if let Err(e) = p.storage.remove(&p.key) {
                warn!(key = %p.key, error = %e, "failed to clear persisted state");
            }
        }
    }

    /// Persist, then publish. Callers hold the writer lock.
    fn commit(&self, next: Arc<S>) {
        if let Some(p) = &self.inner.persistence {
            p.write(&next);
        }
        self.inner.tx.send_replace(next);
    }
}

fn rehydrate<S: Persist>(storage: &dyn Storage, key: &str, default: S) -> S {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "no persisted state, using default");
            return default;
        }
        Err(e) => {
            warn!(key, error = %e, "failed to read persisted state, using default");
            return default;
        }
    };

    match serde_json::from_str::<Envelope<S::Snapshot>>(&raw) {
        Ok(envelope) if envelope.version == S::VERSION => {
            debug!(key, "rehydrated persisted state");
            S::restore(default, envelope.state)
        }
        Ok(envelope) => {
            warn!(
                key,
                stored = envelope.version,
                expected = S::VERSION,
                "persisted state version mismatch, using default"
            );
            default
        }
        Err(e) => {
            warn!(key, error = %e, "malformed persisted state, using default");
            default
        }
    }
}

// ── Subscriptions ────────────────────────────────────────────────────

/// Subscription to one store slice.
pub struct StateStream<S> {
    current: Arc<S>,
    receiver: watch::Receiver<Arc<S>>,
}

impl<S: Send + Sync + 'static> StateStream<S> {
    fn new(receiver: watch::Receiver<Arc<S>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// State captured at subscription (or at the last `changed()`).
    pub fn current(&self) -> &Arc<S> {
        &self.current
    }

    /// Latest state, which may be newer than `current()`.
    pub fn latest(&self) -> Arc<S> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next mutation. `None` once every store handle is gone.
    pub async fn changed(&mut self) -> Option<Arc<S>> {
        self.receiver.changed().await.ok()?;
        let state = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&state);
        Some(state)
    }

    /// Convert into a `Stream` yielding the current state, then every change.
    pub fn into_stream(self) -> StateWatchStream<S> {
        StateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter over a store slice.
pub struct StateWatchStream<S> {
    inner: WatchStream<Arc<S>>,
}

impl<S: Send + Sync + 'static> Stream for StateWatchStream<S> {
    type Item = Arc<S>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
