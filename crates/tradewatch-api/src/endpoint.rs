// Typed endpoint descriptors
//
// An `Endpoint` pairs an operation name with its HTTP shape and typed
// params/output. The operation name doubles as the first element of the
// query-cache key in `tradewatch-core`, so it must be stable.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// HTTP verb used by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A single typed backend operation.
pub trait Endpoint {
    /// Stable operation identifier (e.g. `"trader.positions"`).
    const NAME: &'static str;
    const METHOD: Method;

    /// Parameters. Serialized form is also what the query cache keys on.
    type Params: Serialize + Send + Sync;
    /// Decoded response payload.
    type Output: DeserializeOwned + Send + 'static;

    /// Path relative to the API base URL, without a leading slash.
    fn path(params: &Self::Params) -> String;

    /// Query-string pairs.
    fn query(_params: &Self::Params) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// JSON request body for `POST`/`PUT`.
    fn body(_params: &Self::Params) -> Option<serde_json::Value> {
        None
    }
}
