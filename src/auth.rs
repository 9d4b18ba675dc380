//! OAuth2 client-credentials authentication for the Microsoft identity platform.
//!
//! Acquires bearer tokens from `{authority}/{tenant}/oauth2/v2.0/token` using
//! the client_credentials grant. One `TokenProvider` exists per API audience:
//! a run holds one scoped to Microsoft Graph and one scoped to Defender for
//! Endpoint. Consumers (`ApiClient`) read the cached token via `token()` and
//! call `refresh_token()` when it is absent or stale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{GroupTagError, Result};

/// Public-cloud Microsoft Entra authority.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Scope for Microsoft Graph application permissions.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Scope for Defender for Endpoint application permissions.
pub const DEFENDER_SCOPE: &str = "https://api.securitycenter.microsoft.com/.default";

/// Token requests are small; they never need the API client's longer timeout.
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Safety buffer subtracted from `expires_in` so a token is refreshed
/// before the server starts rejecting it.
const EXPIRY_BUFFER_SECS: u64 = 60;

/// Form body sent to the token endpoint.
#[derive(Serialize)]
pub struct TokenRequest<'a> {
    client_id: &'a str,
    scope: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
}

/// Subset of the token response that we need. Extra fields such as
/// `ext_expires_in` are ignored.
#[derive(Deserialize)]
pub struct TokenResponse {
    /// Bearer token sent in the `Authorization` header.
    pub access_token: String,
    /// Always `Bearer` for this grant.
    pub token_type: String,
    /// Lifetime in seconds from the moment of issue.
    pub expires_in: u64,
}

/// Manages OAuth2 token acquisition and caching for one audience.
///
/// Invariants:
/// - `response` is `None` until the first successful `refresh_token()` and
///   again after `invalidate()`.
/// - `acquired_at` is `Some` exactly when `response` is `Some`.
pub struct TokenProvider {
    client: reqwest::Client,
    authority: String,
    scope: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    response: Option<TokenResponse>,
    acquired_at: Option<Instant>,
}

impl TokenProvider {
    /// Creates a provider for the public-cloud authority. No request is
    /// made until the first `refresh_token()`.
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str, scope: &str) -> Self {
        TokenProvider {
            client: reqwest::Client::builder()
                .timeout(TOKEN_REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            authority: DEFAULT_AUTHORITY.to_string(),
            scope: scope.to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            response: None,
            acquired_at: None,
        }
    }

    /// Overrides the identity-provider authority (national clouds, tests).
    pub fn with_authority(mut self, authority: &str) -> Self {
        self.authority = authority.trim_end_matches('/').to_string();
        self
    }

    /// Creates a `TokenProvider` with a pre-set token, bypassing the
    /// identity provider. The token is treated as freshly acquired.
    pub fn with_token(token: &str) -> Self {
        TokenProvider {
            client: reqwest::Client::new(),
            authority: DEFAULT_AUTHORITY.to_string(),
            scope: String::new(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            response: Some(TokenResponse {
                access_token: token.to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 3600,
            }),
            acquired_at: Some(Instant::now()),
        }
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id)
    }

    /// Fetches a new token and caches it.
    ///
    /// The body is read as text before the status check so the AADSTS
    /// error text survives into `GroupTagError::Auth`.
    pub async fn refresh_token(&mut self) -> Result<()> {
        let body = TokenRequest {
            client_id: &self.client_id,
            scope: &self.scope,
            client_secret: &self.client_secret,
            grant_type: "client_credentials",
        };

        let response = self
            .client
            .post(self.token_url())
            .form(&body)
            .send()
            .await
            .map_err(|e| GroupTagError::Auth {
                message: format!("token request to {} failed", self.authority),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| GroupTagError::Auth {
            message: "failed to read token response".to_string(),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(GroupTagError::Auth {
                message: format!("token request for {} failed ({status}): {text}", self.scope),
                source: None,
            });
        }

        let resp: TokenResponse = serde_json::from_str(&text).map_err(|e| GroupTagError::Auth {
            message: "failed to parse token response".to_string(),
            source: Some(Box::new(e)),
        })?;

        tracing::debug!(scope = %self.scope, expires_in = resp.expires_in, "acquired access token");
        self.acquired_at = Some(Instant::now());
        self.response = Some(resp);

        Ok(())
    }

    /// Drops the cached token. The next `token()` call returns `None`.
    pub fn invalidate(&mut self) {
        self.response = None;
        self.acquired_at = None;
    }

    /// Returns `true` if a token exists but has exceeded its lifetime
    /// (minus the safety buffer). Returns `false` if no token is cached.
    fn is_expired(&self) -> bool {
        match (&self.response, self.acquired_at) {
            (Some(resp), Some(acquired)) => {
                let lifetime = resp.expires_in.saturating_sub(EXPIRY_BUFFER_SECS);
                acquired.elapsed().as_secs() >= lifetime
            }
            _ => false,
        }
    }

    /// Returns the cached access token, or `None` if absent or expired.
    pub fn token(&self) -> Option<&str> {
        if self.is_expired() {
            return None;
        }
        self.response.as_ref().map(|ret| ret.access_token.as_str())
    }
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("authority", &self.authority)
            .field("scope", &self.scope)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("has_token", &self.response.is_some())
            .finish()
    }
}
