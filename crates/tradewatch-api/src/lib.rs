//! Async typed gateway for the tradewatch REST backend.
//!
//! - **[`ApiClient`]**: `reqwest`-backed client. Every request carries the
//!   bearer token configured in [`TransportConfig`]; every response is
//!   decoded into a typed payload or a single [`Error`].
//! - **[`Endpoint`]**: descriptor pairing an operation name with its HTTP
//!   shape and typed params/output. [`ApiClient::call`] executes one; the
//!   operation name is what `tradewatch-core` uses as the cache-key head.
//!
//! No retry or backoff happens here. Callers own retry policy.

pub mod account;
pub mod client;
pub mod copy_trade;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod traders;
pub mod transport;
pub mod vaults;

pub use client::ApiClient;
pub use endpoint::{Endpoint, Method};
pub use error::{Error, ErrorKind};
pub use transport::TransportConfig;
