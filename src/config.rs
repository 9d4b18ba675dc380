//! Run settings from command-line flags, environment and an optional TOML file.
//!
//! Values given on the command line (or through their environment
//! variables) override the file. The client secret is only ever taken from
//! the command line or `MDE_CLIENT_SECRET`, never from the file.
//!
//! ```toml
//! tenant_id = "00000000-0000-0000-0000-000000000000"
//! client_id = "11111111-1111-1111-1111-111111111111"
//! authority = "https://login.microsoftonline.com"
//!
//! [graph]
//! base_url = "https://graph.microsoft.com/v1.0/"
//! scope = "https://graph.microsoft.com/.default"
//!
//! [defender]
//! base_url = "https://api.security.microsoft.com/"
//! scope = "https://api.securitycenter.microsoft.com/.default"
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::auth::{DEFAULT_AUTHORITY, DEFENDER_SCOPE, GRAPH_SCOPE};
use crate::client::{DEFENDER_BASE_URL, GRAPH_BASE_URL};
use crate::error::{GroupTagError, Result};

/// Contents of the optional config file. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Directory (tenant) ID.
    pub tenant_id: Option<String>,
    /// Application (client) ID of the app registration.
    pub client_id: Option<String>,
    /// Identity-provider root, for national clouds.
    pub authority: Option<String>,
    /// `[graph]` table.
    #[serde(default)]
    pub graph: EndpointOverrides,
    /// `[defender]` table.
    #[serde(default)]
    pub defender: EndpointOverrides,
}

/// Per-API overrides from the `[graph]` and `[defender]` tables.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointOverrides {
    /// API root; a trailing `/` is added if missing.
    pub base_url: Option<String>,
    /// `.default` scope requested for this API.
    pub scope: Option<String>,
}

impl FileConfig {
    /// Reads and parses a config file. Unknown keys are rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GroupTagError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| GroupTagError::Config(format!("invalid {}: {e}", path.display())))
    }
}

/// Credentials supplied on the command line or through the environment.
#[derive(Default)]
pub struct CredentialArgs {
    /// `--tenant-id` / `MDE_TENANT_ID`.
    pub tenant_id: Option<String>,
    /// `--client-id` / `MDE_CLIENT_ID`.
    pub client_id: Option<String>,
    /// `--secret` / `MDE_CLIENT_SECRET`.
    pub client_secret: Option<String>,
}

/// Base URL and token scope for one API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// API root, always ending in `/`.
    pub base_url: String,
    /// Token scope for this API.
    pub scope: String,
}

impl Endpoint {
    fn resolve(overrides: EndpointOverrides, base_url: &str, scope: &str) -> Self {
        let mut base_url = overrides.base_url.unwrap_or_else(|| base_url.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Endpoint {
            base_url,
            scope: overrides.scope.unwrap_or_else(|| scope.to_string()),
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Clone)]
pub struct Settings {
    /// Directory (tenant) ID.
    pub tenant_id: String,
    /// Application (client) ID.
    pub client_id: String,
    /// Client secret. Redacted from `Debug` output.
    pub client_secret: String,
    /// Identity-provider root without a trailing `/`.
    pub authority: String,
    /// Microsoft Graph endpoint.
    pub graph: Endpoint,
    /// Defender for Endpoint endpoint.
    pub defender: Endpoint,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authority", &self.authority)
            .field("graph", &self.graph)
            .field("defender", &self.defender)
            .finish()
    }
}

impl Settings {
    /// Merges command-line credentials over file values and fills in
    /// public-cloud defaults.
    ///
    /// # Errors
    ///
    /// `GroupTagError::Config` when the tenant ID, client ID or secret is
    /// missing from every source.
    pub fn resolve(args: CredentialArgs, file: FileConfig) -> Result<Self> {
        let tenant_id = args
            .tenant_id
            .or(file.tenant_id)
            .ok_or_else(|| missing("tenant ID", "--tenant-id or MDE_TENANT_ID"))?;
        let client_id = args
            .client_id
            .or(file.client_id)
            .ok_or_else(|| missing("client ID", "--client-id or MDE_CLIENT_ID"))?;
        let client_secret = args
            .client_secret
            .ok_or_else(|| missing("client secret", "--secret or MDE_CLIENT_SECRET"))?;

        Ok(Settings {
            tenant_id,
            client_id,
            client_secret,
            authority: file
                .authority
                .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
            graph: Endpoint::resolve(file.graph, GRAPH_BASE_URL, GRAPH_SCOPE),
            defender: Endpoint::resolve(file.defender, DEFENDER_BASE_URL, DEFENDER_SCOPE),
        })
    }
}

fn missing(what: &str, hint: &str) -> GroupTagError {
    GroupTagError::Config(format!("{what} is required ({hint})"))
}
