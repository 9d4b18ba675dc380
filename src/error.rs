//! Typed error hierarchy for mde-group-tag.
//!
//! Variants follow the system boundaries a run crosses: the identity
//! provider (`Auth`), the two REST APIs (`Api`, `GroupNotFound`), local
//! settings (`Config`), the operator prompt (`Prompt`), and the transport
//! and decoding layers underneath (`Network`, `Parse`).
//!
//! The console is the only error channel, so every variant renders the
//! remote diagnostic text (status code, response body, AADSTS message)
//! in its `Display` output.

use reqwest::StatusCode;

/// Unified error type for all library operations.
#[derive(Debug, thiserror::Error)]
pub enum GroupTagError {
    /// Token acquisition failed at the Microsoft identity platform.
    ///
    /// Covers non-2xx responses from `/oauth2/v2.0/token` (bad secret,
    /// unknown tenant, missing consent), unparsable token responses, and
    /// transport failures reaching the token endpoint.
    #[error("authentication failed: {message}")]
    Auth {
        /// Description including HTTP status and the identity provider's
        /// error body when available.
        message: String,
        /// The underlying transport or parse error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Microsoft Graph or Defender returned a non-success status.
    ///
    /// The body is kept verbatim; both APIs put their error code and a
    /// human-readable message there.
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code of the failed response.
        status: StatusCode,
        /// Raw response body, or an empty string if it could not be read.
        body: String,
    },

    /// The directory group does not exist or is not visible to the
    /// application's credentials.
    #[error("group {group_id} not found or not accessible: {detail}")]
    GroupNotFound {
        /// The group object ID that was requested.
        group_id: String,
        /// Status and body of the failed lookup.
        detail: String,
    },

    /// Settings are missing or the config file is unreadable/invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading the operator's confirmation answer failed.
    #[error("failed to read confirmation: {0}")]
    Prompt(#[source] std::io::Error),

    /// A response body did not match the expected JSON shape.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Transport-level failure (DNS, TCP, TLS, timeout). No status code
    /// is available because the request did not complete.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl GroupTagError {
    /// Returns the HTTP status for `Api` errors, `None` otherwise.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GroupTagError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, GroupTagError>;
