//! Authenticated HTTP client shared by the Graph and Defender stages.
//!
//! `ApiClient` wraps a `reqwest::Client`, a base URL and a `TokenProvider`
//! behind a `Mutex`, and exposes JSON helpers (`get`, `get_url`, `post`)
//! plus `post_accepted` for writes whose response body is not needed.
//! One instance exists per API audience.
//!
//! Caller-supplied IDs are spliced into paths through [`encode_segment`]
//! so a `/`, `?` or `#` inside an ID cannot change the target resource.
//!
//! Token lifecycle:
//! - Lazy acquisition: a request that finds no cached token triggers
//!   `refresh_token()` via `bearer_token()`. `authenticate()` does the same
//!   eagerly so credential problems surface before any work starts.
//! - One-shot 401 handling: if the API answers `401 Unauthorized`, the
//!   cached token is invalidated, refreshed once, and the request is sent
//!   exactly once more. A second 401 is returned as an `Api` error.
//! - `release()` drops the cached token at the end of a run.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::auth::TokenProvider;
use crate::error::{GroupTagError, Result};

/// Microsoft Graph v1.0 root.
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0/";

/// Defender for Endpoint API root.
pub const DEFENDER_BASE_URL: &str = "https://api.security.microsoft.com/";

/// Covers TCP + TLS handshake only.
const API_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Full round-trip limit. Inventory pages hold up to 10,000 machines.
const API_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// RFC 3986 unreserved characters stay literal; everything else in a path
/// segment is percent-encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes one path segment, such as an object or machine ID.
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

fn build_api_client() -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(API_CONNECT_TIMEOUT)
        .timeout(API_REQUEST_TIMEOUT)
        .build()?)
}

/// Authenticated HTTP client for one REST API.
///
/// `auth` sits behind a `Mutex` because `refresh_token()` needs `&mut self`
/// while request methods only take `&self`. The lock is held for the token
/// check/refresh only, never across an API round-trip.
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Mutex<TokenProvider>,
}

impl ApiClient {
    /// Creates a client rooted at `base_url`. Paths passed to `get`/`post`
    /// are appended verbatim, so `base_url` should end with `/`.
    pub fn new(auth: TokenProvider, base_url: &str) -> Result<Self> {
        Ok(ApiClient {
            client: build_api_client()?,
            base_url: base_url.to_string(),
            auth: Mutex::new(auth),
        })
    }

    /// Root URL that relative paths are appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Acquires a token now instead of on the first request.
    pub async fn authenticate(&self) -> Result<()> {
        self.bearer_token().await.map(|_| ())
    }

    /// Drops the cached token. Further requests would re-authenticate.
    pub async fn release(&self) {
        self.auth.lock().await.invalidate();
    }

    async fn bearer_token(&self) -> Result<String> {
        let mut auth = self.auth.lock().await;
        if auth.token().is_none() {
            auth.refresh_token().await?;
        }

        auth.token().map(str::to_owned).ok_or_else(|| GroupTagError::Auth {
            message: "token missing after refresh".to_string(),
            source: None,
        })
    }

    async fn force_refresh(&self) -> Result<String> {
        let mut auth = self.auth.lock().await;
        auth.invalidate();
        auth.refresh_token().await?;

        auth.token().map(str::to_owned).ok_or_else(|| GroupTagError::Auth {
            message: "token missing after forced refresh".to_string(),
            source: None,
        })
    }

    /// Sends an authenticated request to an absolute URL, refreshing the
    /// token and re-sending once on 401. The response status is not checked.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        tracing::debug!(%method, url, "sending request");

        let token = self.bearer_token().await?;
        let resp = self
            .build_request(method.clone(), url, &token, body)
            .send()
            .await?;

        let resp = if resp.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!(url, "received 401, refreshing token and retrying once");
            let fresh_token = self.force_refresh().await?;
            self.build_request(method, url, &fresh_token, body)
                .send()
                .await?
        } else {
            resp
        };

        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let resp = self.send(method, url, body).await?;
        decode_response(resp).await
    }

    fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&B>,
    ) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, url).bearer_auth(token);
        if let Some(payload) = body {
            req = req.json(payload);
        }
        req
    }

    /// GET a path relative to the base URL.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        self.send_json::<T, ()>(Method::GET, &url, None).await
    }

    /// GET an absolute URL, such as an `@odata.nextLink` continuation.
    pub async fn get_url<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send_json::<T, ()>(Method::GET, url, None).await
    }

    /// POST a JSON body to a path relative to the base URL.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        self.send_json(Method::POST, &url, Some(body)).await
    }

    /// POST a JSON body and succeed on any 2xx status. The response body
    /// is only read to build the error for a non-2xx status.
    pub async fn post_accepted<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.send(Method::POST, &url, Some(body)).await?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GroupTagError::Api { status, body })
}

/// Reads the body before checking the status so API diagnostics are kept
/// in `GroupTagError::Api` instead of being discarded.
async fn decode_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(GroupTagError::Api { status, body });
    }

    Ok(serde_json::from_str(&body)?)
}
