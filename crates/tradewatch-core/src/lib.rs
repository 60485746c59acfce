//! Read-model sync layer between `tradewatch-api` and UI consumers.
//!
//! - **[`Session`]**: Facade owning the gateway client, the query cache
//!   and the state slices for one user. Exposes typed queries
//!   ([`leaderboard()`](Session::leaderboard), [`copy_wallets()`](Session::copy_wallets), ...)
//!   and mutations that invalidate the affected queries once the backend
//!   has caught up.
//!
//! - **[`QueryClient`]**: Keyed cache of server data. Concurrent observers
//!   of one key share a single request, responses older than the newest
//!   request are dropped, and unobserved entries are evicted after a grace
//!   period. Observation goes through [`QueryObserver<T>`].
//!
//! - **[`Store<S>`]**: `tokio::sync::watch`-backed state slice with
//!   optional versioned persistence through a [`Storage`](store::Storage)
//!   backend.
//!
//! - **View builders** ([`view`]): Pure functions turning cached data into
//!   display values: leaderboard rows, chart points, unit conversions,
//!   per-instrument multiplier overrides.

pub mod config;
pub mod error;
pub mod query;
pub mod session;
pub mod store;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CacheSettings, SessionConfig, StorageBackend};
pub use error::CoreError;
pub use query::{KeyFilter, QueryClient, QueryKey, QueryObserver, QueryOptions, QueryState, QueryStatus};
pub use session::Session;
pub use store::Store;
