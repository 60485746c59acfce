// ── Query, invalidation and mutation options ──

use std::fmt;
use std::time::Duration;

use super::key::KeyFilter;

/// Per-observer fetch policy.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Disabled observers never trigger fetches and are skipped by invalidation.
    pub enabled: bool,
    /// How long committed data counts as fresh.
    pub stale_time: Duration,
    /// Retries after the first failed attempt (transient errors only).
    pub retry: u32,
    /// Pause between retries. Zero retries immediately.
    pub retry_delay: Duration,
    /// Poll while the observer is alive.
    pub refetch_interval: Option<Duration>,
    /// Refetch on subscribe even when cached data is fresh.
    pub refetch_on_subscribe: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: Duration::ZERO,
            retry: 3,
            retry_delay: Duration::ZERO,
            refetch_interval: None,
            refetch_on_subscribe: false,
        }
    }
}

impl QueryOptions {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn refetch_on_subscribe(mut self, refetch: bool) -> Self {
        self.refetch_on_subscribe = refetch;
        self
    }
}

/// Client-wide settings.
#[derive(Debug, Clone)]
pub struct QueryClientConfig {
    /// How long an entry with no observers survives. Zero evicts immediately.
    pub gc_time: Duration,
}

impl Default for QueryClientConfig {
    fn default() -> Self {
        Self {
            gc_time: Duration::from_secs(300),
        }
    }
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Options for a deferred invalidation.
#[derive(Default)]
pub struct InvalidateOptions {
    /// Wait before marking entries stale and refetching.
    pub delay: Option<Duration>,
    /// Runs once every refetch triggered by the invalidation has settled.
    pub on_complete: Option<Callback>,
}

impl InvalidateOptions {
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for InvalidateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidateOptions")
            .field("delay", &self.delay)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// What to invalidate after a successful mutation.
#[derive(Debug, Clone, Default)]
pub struct MutationOptions {
    pub invalidate: Vec<KeyFilter>,
    /// Delay before invalidating, for backends that settle writes lazily.
    pub delay: Duration,
}

impl MutationOptions {
    pub fn invalidates(mut self, filter: impl Into<KeyFilter>) -> Self {
        self.invalidate.push(filter.into());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}
