//! Resilient HTTP transport.
//!
//! Every outbound request goes through [`Transport`], which enforces a
//! pacing sleep before dispatch and converts any transport-level failure
//! (DNS, connect, timeout, body read) into a sentinel [`RawResponse`]
//! with an unset status, logging exactly one line per failure. Callers
//! branch on the sentinel instead of catching errors; retrying is the
//! job of [`crate::retry::RetryPolicy`].

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::sleep;

use crate::error::Result;

/// Floor on the pacing interval, so a zero-configured interval cannot
/// hammer the remote host.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Default pacing interval between requests.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:88.0) Gecko/20100101 Firefox/88.0";

/// Immutable per-client transport configuration.
///
/// Each logical client (one per site/account) owns its own value; there
/// is no shared mutable default state between instances.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Seconds slept before every dispatch (floored at [`MIN_INTERVAL`]).
    pub interval: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent sent on every request.
    pub user_agent: String,
    /// Headers attached to every request (e.g. a Referer).
    pub default_headers: HeaderMap,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: HeaderMap::new(),
        }
    }
}

/// Response carrier used by every client in this crate.
///
/// A request that never produced an HTTP status (connection error,
/// timeout) yields `status: None` with the original URL attached; that
/// unset status is the uniform failure signal.
#[derive(Debug, Clone)]
pub struct RawResponse {
    url: String,
    status: Option<StatusCode>,
    body: Vec<u8>,
}

impl RawResponse {
    /// Sentinel response for a request that failed at the transport level.
    pub fn sentinel(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: None,
            body: Vec::new(),
        }
    }

    /// URL this response was produced for.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP status, or `None` when the request never completed.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// True when a status was received and it is 2xx.
    pub fn ok(&self) -> bool {
        self.status.is_some_and(|s| s.is_success())
    }

    /// Raw body bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Consume the response, returning the body.
    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    /// Body decoded as (lossy) UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON, logging one line on parse failure.
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        match serde_json::from_slice(&self.body) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!("{}: invalid JSON body: {}", self.url, e);
                None
            }
        }
    }
}

/// Session wrapper around [`reqwest::Client`].
pub struct Transport {
    client: Client,
    interval: Duration,
    extra_headers: RwLock<HeaderMap>,
}

impl Transport {
    /// Build a transport from an explicit configuration value.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .cookie_store(true)
            .default_headers(config.default_headers.clone())
            .build()?;

        Ok(Self {
            client,
            interval: config.interval.max(MIN_INTERVAL),
            extra_headers: RwLock::new(HeaderMap::new()),
        })
    }

    /// Set (or replace) a header attached to every subsequent request.
    ///
    /// Used by authenticated clients to keep the `Authorization` header
    /// in sync with the current token.
    pub async fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.extra_headers.write().await.insert(name, value);
    }

    /// GET with query parameters.
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> RawResponse {
        let req = self.client.request(Method::GET, url).query(query);
        self.dispatch(url, req).await
    }

    /// POST with a JSON body.
    pub async fn post_json<T: Serialize + ?Sized>(&self, url: &str, json: &T) -> RawResponse {
        let req = self.client.request(Method::POST, url).json(json);
        self.dispatch(url, req).await
    }

    /// PUT raw bytes (used for presigned part-upload URLs).
    pub async fn put_bytes(&self, url: &str, body: Vec<u8>) -> RawResponse {
        let req = self.client.request(Method::PUT, url).body(body);
        self.dispatch(url, req).await
    }

    async fn dispatch(&self, url: &str, req: RequestBuilder) -> RawResponse {
        // Unconditional pacing sleep before every dispatch.
        sleep(self.interval).await;

        let req = req.headers(self.extra_headers.read().await.clone());

        let res = match req.send().await {
            Ok(res) => res,
            Err(e) => {
                tracing::error!("{}: {}", url, e);
                return RawResponse::sentinel(url);
            }
        };

        let status = res.status();
        if !status.is_success() {
            tracing::warn!("{}: HTTP {}", url, status);
        }

        match res.bytes().await {
            Ok(body) => RawResponse {
                url: url.to_string(),
                status: Some(status),
                body: body.to_vec(),
            },
            Err(e) => {
                tracing::error!("{}: {}", url, e);
                RawResponse::sentinel(url)
            }
        }
    }
}
