// Gateway HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, error-body parsing and
// typed decoding. Endpoint catalogs (traders, copy trading, account,
// vaults) are implemented as inherent methods in sibling files to keep
// this module focused on transport mechanics.

use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::endpoint::{Endpoint, Method};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Error body shapes returned by the backend on non-2xx responses.
#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Async client for the tradewatch REST backend.
///
/// Cheap to clone: `reqwest::Client` is reference-counted internally.
/// No retries happen here; the query cache owns retry policy.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and transport config (timeout, bearer token).
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends with `/` so relative joins append.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Generic call ─────────────────────────────────────────────────

    /// Issue the request described by `E` and decode its output.
    pub async fn call<E: Endpoint>(&self, params: &E::Params) -> Result<E::Output, Error> {
        let url = self.base_url.join(&E::path(params))?;
        let query = E::query(params);
        debug!(operation = E::NAME, "{} {url}", E::METHOD);

        let builder = match E::METHOD {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Put => self.http.put(url),
            Method::Delete => self.http.delete(url),
        };
        let builder = if query.is_empty() {
            builder
        } else {
            builder.query(&query)
        };
        let builder = match E::body(params) {
            Some(body) => builder.json(&body),
            None => builder,
        };

        let resp = builder.send().await?;
        Self::handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        trace!(bytes = body.len(), "response body received");

        // Empty 2xx bodies (typically DELETE) decode as JSON `null`.
        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Decode {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            Error::Http {
                status: status.as_u16(),
                message: err
                    .message
                    .or(err.error)
                    .unwrap_or_else(|| status.to_string()),
                code: err.code,
            }
        } else {
            Error::Http {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw.chars().take(200).collect()
                },
                code: None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = ApiClient::from_reqwest("https://api.example.com/v1", reqwest::Client::new())
            .unwrap();
        assert_eq!(client.base_url().as_str(), "https://api.example.com/v1/");
    }

    #[test]
    fn base_url_trailing_slash_is_not_doubled() {
        let client = ApiClient::from_reqwest("https://api.example.com/v1/", reqwest::Client::new())
            .unwrap();
        assert_eq!(
            client.base_url().join("me").unwrap().as_str(),
            "https://api.example.com/v1/me"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = ApiClient::from_reqwest("::nope", reqwest::Client::new());
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
