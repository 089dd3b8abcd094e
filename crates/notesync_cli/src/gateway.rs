//! Gateway selection for the CLI.

use crate::client::ReqwestClient;
use notesync_engine::{HttpGateway, HttpGatewayConfig, OfflineGateway, RemoteGateway, RemoteResult};
use notesync_protocol::{Note, RemoteNote};

/// The remote the CLI talks to: a server, or nothing at all.
pub enum CliGateway {
    /// No server configured; every remote call fails transiently.
    Offline(OfflineGateway),
    /// A note server over HTTP.
    Http(HttpGateway<ReqwestClient>),
}

impl CliGateway {
    /// A gateway with no server.
    pub fn offline() -> Self {
        CliGateway::Offline(OfflineGateway)
    }

    /// A gateway to the server at `config.base_url`.
    pub fn http(config: HttpGatewayConfig) -> Result<Self, reqwest::Error> {
        Ok(CliGateway::Http(HttpGateway::new(config, ReqwestClient::new()?)))
    }

    /// Returns true if a server is configured.
    pub fn has_server(&self) -> bool {
        matches!(self, CliGateway::Http(_))
    }

    /// Describes the remote for status output.
    pub fn describe(&self) -> String {
        match self {
            CliGateway::Offline(_) => "none (offline)".to_string(),
            CliGateway::Http(gateway) => gateway.base_url().to_string(),
        }
    }
}

impl RemoteGateway for CliGateway {
    async fn create_remote(&self, note: &Note) -> RemoteResult<String> {
        match self {
            CliGateway::Offline(g) => g.create_remote(note).await,
            CliGateway::Http(g) => g.create_remote(note).await,
        }
    }

    async fn update_remote(&self, remote_id: &str, title: &str) -> RemoteResult<()> {
        match self {
            CliGateway::Offline(g) => g.update_remote(remote_id, title).await,
            CliGateway::Http(g) => g.update_remote(remote_id, title).await,
        }
    }

    async fn delete_remote(&self, remote_id: &str) -> RemoteResult<()> {
        match self {
            CliGateway::Offline(g) => g.delete_remote(remote_id).await,
            CliGateway::Http(g) => g.delete_remote(remote_id).await,
        }
    }

    async fn list_remote(&self) -> RemoteResult<Vec<RemoteNote>> {
        match self {
            CliGateway::Offline(g) => g.list_remote().await,
            CliGateway::Http(g) => g.list_remote().await,
        }
    }
}
