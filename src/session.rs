//! Authenticated context for one run.
//!
//! A `Session` owns one `ApiClient` per API and is passed by reference to
//! every stage. It is created once by [`Session::connect`] and released
//! once by [`Session::close`]; `workflow::execute` guarantees the release
//! on every exit path.

use crate::auth::TokenProvider;
use crate::client::ApiClient;
use crate::config::Settings;
use crate::error::Result;

/// The Graph and Defender clients for one run.
pub struct Session {
    directory: ApiClient,
    defender: ApiClient,
}

impl Session {
    /// Wraps two already-built clients. Used directly by tests.
    pub fn new(directory: ApiClient, defender: ApiClient) -> Self {
        Session {
            directory,
            defender,
        }
    }

    /// Builds both clients from `settings` and acquires both tokens up
    /// front. If either acquisition fails the session is released before
    /// the error is returned.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let provider = |scope: &str| {
            TokenProvider::new(
                &settings.tenant_id,
                &settings.client_id,
                &settings.client_secret,
                scope,
            )
            .with_authority(&settings.authority)
        };

        let session = Session::new(
            ApiClient::new(provider(&settings.graph.scope), &settings.graph.base_url)?,
            ApiClient::new(provider(&settings.defender.scope), &settings.defender.base_url)?,
        );

        if let Err(e) = session.authenticate().await {
            session.close().await;
            return Err(e);
        }
        tracing::info!("authenticated to Microsoft Graph and Defender for Endpoint");
        Ok(session)
    }

    async fn authenticate(&self) -> Result<()> {
        self.directory.authenticate().await?;
        self.defender.authenticate().await
    }

    /// Client for Microsoft Graph.
    pub fn directory(&self) -> &ApiClient {
        &self.directory
    }

    /// Client for the Defender for Endpoint API.
    pub fn defender(&self) -> &ApiClient {
        &self.defender
    }

    /// Drops both cached tokens and consumes the session.
    pub async fn close(self) {
        self.directory.release().await;
        self.defender.release().await;
        tracing::debug!("session released");
    }
}
