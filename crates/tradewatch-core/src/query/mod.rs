//! Query cache: keyed, de-duplicated, generation-ordered fetch results.
//!
//! One [`QueryClient`] per session holds every cache entry. Consumers
//! subscribe with [`QueryClient::observe`] and receive a [`QueryObserver`]
//! that follows the entry through `idle -> pending -> success | error`.

mod client;
mod key;
mod observer;
mod options;
mod state;

pub use client::QueryClient;
pub use key::{KeyFilter, KeyParam, QueryKey};
pub use observer::{QueryObserver, Settled};
pub use options::{InvalidateOptions, MutationOptions, QueryClientConfig, QueryOptions};
pub use state::{QueryState, QueryStatus};
