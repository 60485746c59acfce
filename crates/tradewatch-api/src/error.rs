use thiserror::Error;

/// Coarse failure taxonomy shared by every gateway error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The request never produced an HTTP response.
    Network,
    /// The backend answered with a non-2xx status.
    Http,
    /// The response body did not match the expected shape.
    Decode,
}

/// Top-level error type for the `tradewatch-api` crate.
///
/// Every endpoint surfaces exactly one of these. `tradewatch-core` stores
/// them unchanged in the query cache, so consumers can inspect `kind()`
/// and `http_status()` when rendering failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Bearer token could not be encoded as a header value.
    #[error("Invalid bearer token: {0}")]
    InvalidToken(String),

    // ── Backend ─────────────────────────────────────────────────────
    /// Non-2xx response. `message` comes from the error body when present.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        code: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Decode { message: String, body: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(e) if e.is_decode() => ErrorKind::Decode,
            Self::Transport(e) if e.status().is_some() => ErrorKind::Http,
            Self::Transport(_) | Self::InvalidUrl(_) | Self::InvalidToken(_) => ErrorKind::Network,
            Self::Http { .. } => ErrorKind::Http,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// HTTP status code, if the backend produced a response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the bearer token was rejected.
    pub fn is_unauthorized(&self) -> bool {
        self.http_status() == Some(401)
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.http_status() == Some(404)
    }

    /// Extract the backend error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
