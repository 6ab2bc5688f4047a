// crates/ragpoint-providers/src/http.rs
// ============================================================================
// Module: HTTP Transport
// Description: Bounded blocking HTTP client shared by models and loaders.
// Purpose: Enforce scheme, timeout, redirect, and size policy on every call.
// Dependencies: reqwest, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`HttpClient`] wraps a blocking reqwest client configured from
//! [`HttpPolicy`]. Every outbound call validates the URL scheme, disables
//! redirects, and reads responses through a byte limit so that an
//! adversarial endpoint cannot exhaust memory. Failures are classified into
//! [`HttpError`] variants that callers map onto their own error types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Outbound HTTP policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpPolicy {
    /// Allow cleartext HTTP (disabled by default).
    #[serde(default)]
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            allow_http: false,
            timeout_ms: default_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

/// Default request timeout (ms); model calls can be slow.
const fn default_timeout_ms() -> u64 {
    120_000
}

/// Default response size limit (bytes).
const fn default_max_response_bytes() -> usize {
    16 * 1024 * 1024
}

/// Default user agent.
fn default_user_agent() -> String {
    format!("ragpoint/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP transport errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// URL could not be parsed or violates the scheme policy.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// Client construction failed.
    #[error("http client build failed: {0}")]
    Client(String),
    /// Request could not be sent or timed out.
    #[error("http request failed: {0}")]
    Request(String),
    /// Endpoint returned a non-success status.
    #[error("http status {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },
    /// Response exceeded the size limit or was truncated.
    #[error("http response exceeds size limit")]
    TooLarge,
    /// Response body could not be read or decoded.
    #[error("invalid http response: {0}")]
    Body(String),
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Fetched document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL.
    pub url: String,
    /// Content type header, when present.
    pub content_type: Option<String>,
    /// Decoded body text.
    pub body: String,
}

/// Bounded blocking HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    /// Policy applied to every request.
    policy: HttpPolicy,
    /// Underlying reqwest client.
    client: Client,
}

impl HttpClient {
    /// Builds a client for the given policy.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Client`] when the client cannot be created.
    pub fn new(policy: HttpPolicy) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(policy.timeout_ms))
            .user_agent(policy.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| HttpError::Client(err.to_string()))?;
        Ok(Self {
            policy,
            client,
        })
    }

    /// Returns the client policy.
    #[must_use]
    pub const fn policy(&self) -> &HttpPolicy {
        &self.policy
    }

    /// Parses and validates a URL against the scheme policy.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] when the URL is malformed or uses a
    /// disallowed scheme.
    pub fn parse_url(&self, raw: &str) -> Result<Url, HttpError> {
        let url = Url::parse(raw).map_err(|err| HttpError::InvalidUrl(err.to_string()))?;
        match url.scheme() {
            "https" => {}
            "http" if self.policy.allow_http => {}
            other => return Err(HttpError::InvalidUrl(format!("unsupported url scheme: {other}"))),
        }
        if url.host_str().is_none() {
            return Err(HttpError::InvalidUrl("url host required".to_string()));
        }
        Ok(url)
    }

    /// Posts a JSON body and decodes a JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when the request fails, the status is not a
    /// success, or the body is not JSON within the size limit.
    pub fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<Value, HttpError> {
        let url = self.parse_url(url)?;
        let mut request = self.client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let bytes = self.send(request)?.1;
        serde_json::from_slice(&bytes).map_err(|err| HttpError::Body(err.to_string()))
    }

    /// Fetches a page as text.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when the request fails, the status is not a
    /// success, or the body exceeds the size limit.
    pub fn get_text(&self, url: &str) -> Result<FetchedPage, HttpError> {
        let parsed = self.parse_url(url)?;
        let (content_type, bytes) = self.send(self.client.get(parsed.clone()))?;
        Ok(FetchedPage {
            url: parsed.to_string(),
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Sends a request and reads the bounded body of a success response.
    fn send(&self, request: RequestBuilder) -> Result<(Option<String>, Vec<u8>), HttpError> {
        let mut response = request.send().map_err(|err| HttpError::Request(err.to_string()))?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = read_response_limited(&mut response, self.policy.max_response_bytes)?;
        if !status.is_success() {
            let preview: String = String::from_utf8_lossy(&body).chars().take(256).collect();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body: preview,
            });
        }
        Ok((content_type, body))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, HttpError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| HttpError::Body("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(HttpError::TooLarge);
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle.read_to_end(&mut buf).map_err(|err| HttpError::Body(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(HttpError::TooLarge);
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected)
            .map_err(|_| HttpError::Body("invalid response length".to_string()))?;
        if buf.len() < expected {
            return Err(HttpError::Body("http response truncated".to_string()));
        }
    }
    Ok(buf)
}

/// Joins a base URL and an endpoint path with exactly one slash.
#[must_use]
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
