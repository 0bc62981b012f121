//! Administrative API client.
//!
//! [`connect`] establishes the long-lived authenticated channel reused by
//! every operation in a reconciliation run. The [`AdminApi`] trait is the
//! seam the reconciliation engine executes against; [`GrpcAdminApi`] is its
//! gRPC implementation. Transport failures are normalized into the provider
//! error taxonomy so the engine can classify them for retry.

use async_trait::async_trait;
use tonic::transport::{Certificate, ClientTlsConfig, Endpoint, Identity};
use tonic::Code;
use tracing::{debug, info, instrument, warn};

use dexsync_core::error::{ProviderError, ProviderResult};

use crate::config::{ConnectionConfig, TlsMode};
use crate::proto;
use crate::proto::dex_client::DexClient;

/// An OAuth2 client as seen over the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteClient {
    pub id: String,
    /// Plaintext client secret. Transport-level value; the engine wraps it
    /// before it reaches state or summaries.
    pub secret: String,
    pub redirect_uris: Vec<String>,
    pub trusted_peers: Vec<String>,
    pub public: bool,
    pub name: String,
    pub logo_url: String,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .field("redirect_uris", &self.redirect_uris)
            .field("trusted_peers", &self.trusted_peers)
            .field("public", &self.public)
            .field("name", &self.name)
            .field("logo_url", &self.logo_url)
            .finish()
    }
}

/// A connector as seen over the wire. The config payload may embed
/// credentials and is redacted in debug output.
#[derive(Clone, PartialEq)]
pub struct RemoteConnector {
    pub id: String,
    pub connector_type: String,
    pub name: String,
    pub config: serde_json::Value,
}

impl std::fmt::Debug for RemoteConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConnector")
            .field("id", &self.id)
            .field("connector_type", &self.connector_type)
            .field("name", &self.name)
            .field("config", &"<redacted>")
            .finish()
    }
}

/// Result of a client create call.
#[derive(Debug, Clone)]
pub struct ClientCreation {
    /// The remote already holds a client with this ID.
    pub already_exists: bool,
    /// The stored client, when the service returns it.
    pub client: Option<RemoteClient>,
}

/// Partial update of a client. `None` fields are left unchanged remotely.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub id: String,
    pub redirect_uris: Option<Vec<String>>,
    pub trusted_peers: Option<Vec<String>>,
    pub name: Option<String>,
    pub logo_url: Option<String>,
    /// Rotated secret. Carried out-of-band of Debug formatting by the
    /// caller; never logged here.
    pub secret: Option<String>,
}

/// Partial update of a connector. `None` fields are left unchanged remotely.
#[derive(Debug, Clone, Default)]
pub struct ConnectorUpdate {
    pub id: String,
    pub new_name: Option<String>,
    pub new_config: Option<serde_json::Value>,
}

/// Identity service version report.
#[derive(Debug, Clone)]
pub struct ServerVersion {
    pub server: String,
    pub api: i32,
}

/// Administrative operations the reconciliation engine executes.
///
/// Idempotency signals follow the service's wire contract: creates report
/// `already_exists`, updates report whether the target was found, deletes
/// report whether the target existed.
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Create an OAuth2 client.
    async fn create_client(&self, client: RemoteClient) -> ProviderResult<ClientCreation>;

    /// Fetch an OAuth2 client by ID.
    async fn get_client(&self, id: &str) -> ProviderResult<Option<RemoteClient>>;

    /// Apply a partial update. Returns `false` when the target no longer
    /// exists.
    async fn update_client(&self, update: ClientUpdate) -> ProviderResult<bool>;

    /// Delete an OAuth2 client. Returns `false` when it was already absent.
    async fn delete_client(&self, id: &str) -> ProviderResult<bool>;

    /// Create a connector. Returns `true` when the remote already holds one
    /// with this ID.
    async fn create_connector(&self, connector: RemoteConnector) -> ProviderResult<bool>;

    /// Apply a partial update. Returns `false` when the target no longer
    /// exists.
    async fn update_connector(&self, update: ConnectorUpdate) -> ProviderResult<bool>;

    /// Delete a connector. Returns `false` when it was already absent.
    async fn delete_connector(&self, id: &str) -> ProviderResult<bool>;

    /// List all connectors.
    async fn list_connectors(&self) -> ProviderResult<Vec<RemoteConnector>>;

    /// Fetch a connector by ID.
    ///
    /// The administrative API has no point lookup for connectors; the
    /// default implementation filters the listing.
    async fn get_connector(&self, id: &str) -> ProviderResult<Option<RemoteConnector>> {
        let connectors = self.list_connectors().await?;
        Ok(connectors.into_iter().find(|c| c.id == id))
    }

    /// Report the service version. Used as a connect-time health probe.
    async fn version(&self) -> ProviderResult<ServerVersion>;
}

/// Establish the administrative channel described by `config`.
///
/// Fails with a connection error when the endpoint is unreachable or the
/// TLS handshake fails; this is fatal for the run. A version probe verifies
/// the service actually answers before any reconciliation proceeds.
#[instrument(skip(config), fields(host = %config.host))]
pub async fn connect(config: &ConnectionConfig) -> ProviderResult<GrpcAdminApi> {
    let mode = config.tls_mode()?;
    if mode == TlsMode::Insecure {
        warn!(
            host = %config.host,
            "TLS is disabled for the administrative channel; development only"
        );
    }
    let uri = config.endpoint_uri()?;

    let mut endpoint = Endpoint::from_shared(uri.clone())
        .map_err(|e| {
            ProviderError::connection_with_source(format!("invalid endpoint {uri}"), e)
        })?
        .connect_timeout(config.connect_timeout());

    if matches!(mode, TlsMode::ServerOnly | TlsMode::Mutual) {
        let mut tls = ClientTlsConfig::new();
        if let Some(ca) = &config.ca_cert {
            tls = tls.ca_certificate(Certificate::from_pem(ca));
        }
        if let (Some(cert), Some(key)) = (&config.client_cert, &config.client_key) {
            tls = tls.identity(Identity::from_pem(cert, key.expose()));
        }
        endpoint = endpoint.tls_config(tls).map_err(|e| {
            ProviderError::connection_with_source("invalid TLS configuration", e)
        })?;
    }

    debug!(mode = %mode, "Establishing administrative channel");
    let channel = endpoint.connect().await.map_err(|e| {
        ProviderError::connection_with_source(
            format!("failed to connect to identity service at {}", config.host),
            e,
        )
    })?;

    let api = GrpcAdminApi {
        channel,
        timeout: config.timeout(),
    };

    // Lightweight readiness probe before any reconciliation proceeds.
    let version = api.version().await.map_err(|e| {
        ProviderError::connection(format!(
            "identity service at {} did not answer version probe: {e}",
            config.host
        ))
    })?;
    info!(
        server = %version.server,
        api_version = version.api,
        tls_mode = %mode,
        "Connected to identity service"
    );

    Ok(api)
}

/// gRPC-backed [`AdminApi`] implementation.
///
/// The channel is cheap to clone and shared read-only across all workers of
/// a run; per-call deadlines are enforced here.
#[derive(Debug, Clone)]
pub struct GrpcAdminApi {
    channel: tonic::transport::Channel,
    timeout: std::time::Duration,
}

impl GrpcAdminApi {
    fn client(&self) -> DexClient<tonic::transport::Channel> {
        DexClient::new(self.channel.clone())
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> ProviderResult<T>
    where
        F: std::future::Future<Output = Result<tonic::Response<T>, tonic::Status>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Err(_) => Err(ProviderError::timeout(operation, self.timeout.as_secs())),
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) => Err(map_status(operation, &status)),
        }
    }
}

#[async_trait]
impl AdminApi for GrpcAdminApi {
    async fn create_client(&self, client: RemoteClient) -> ProviderResult<ClientCreation> {
        let mut grpc = self.client();
        let request = proto::CreateClientReq {
            client: Some(client_to_proto(client)),
        };
        let resp = self
            .call("CreateClient", grpc.create_client(request))
            .await?;
        Ok(ClientCreation {
            already_exists: resp.already_exists,
            client: resp.client.map(client_from_proto),
        })
    }

    async fn get_client(&self, id: &str) -> ProviderResult<Option<RemoteClient>> {
        let mut grpc = self.client();
        let request = proto::GetClientReq { id: id.to_string() };
        match self.call("GetClient", grpc.get_client(request)).await {
            Ok(resp) => Ok(resp.client.map(client_from_proto)),
            // Older service versions answer NOT_FOUND instead of an empty
            // response.
            Err(ProviderError::Remote { message, .. }) if message.contains("not found") => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update_client(&self, update: ClientUpdate) -> ProviderResult<bool> {
        let mut grpc = self.client();
        let request = proto::UpdateClientReq {
            id: update.id,
            redirect_uris: update.redirect_uris.unwrap_or_default(),
            trusted_peers: update.trusted_peers.unwrap_or_default(),
            name: update.name.unwrap_or_default(),
            logo_url: update.logo_url.unwrap_or_default(),
            new_secret: update.secret.unwrap_or_default(),
        };
        let resp = self
            .call("UpdateClient", grpc.update_client(request))
            .await?;
        Ok(!resp.not_found)
    }

    async fn delete_client(&self, id: &str) -> ProviderResult<bool> {
        let mut grpc = self.client();
        let request = proto::DeleteClientReq { id: id.to_string() };
        let resp = self
            .call("DeleteClient", grpc.delete_client(request))
            .await?;
        Ok(!resp.not_found)
    }

    async fn create_connector(&self, connector: RemoteConnector) -> ProviderResult<bool> {
        let mut grpc = self.client();
        let request = proto::CreateConnectorReq {
            connector: Some(connector_to_proto(connector)?),
        };
        let resp = self
            .call("CreateConnector", grpc.create_connector(request))
            .await?;
        Ok(resp.already_exists)
    }

    async fn update_connector(&self, update: ConnectorUpdate) -> ProviderResult<bool> {
        let mut grpc = self.client();
        let new_config = match update.new_config {
            Some(value) => serde_json::to_vec(&value)?,
            None => Vec::new(),
        };
        let request = proto::UpdateConnectorReq {
            id: update.id,
            new_type: String::new(),
            new_name: update.new_name.unwrap_or_default(),
            new_config,
        };
        let resp = self
            .call("UpdateConnector", grpc.update_connector(request))
            .await?;
        Ok(!resp.not_found)
    }

    async fn delete_connector(&self, id: &str) -> ProviderResult<bool> {
        let mut grpc = self.client();
        let request = proto::DeleteConnectorReq { id: id.to_string() };
        let resp = self
            .call("DeleteConnector", grpc.delete_connector(request))
            .await?;
        Ok(!resp.not_found)
    }

    async fn list_connectors(&self) -> ProviderResult<Vec<RemoteConnector>> {
        let mut grpc = self.client();
        let resp = self
            .call("ListConnectors", grpc.list_connectors(proto::ListConnectorsReq {}))
            .await?;
        resp.connectors
            .into_iter()
            .map(connector_from_proto)
            .collect()
    }

    async fn version(&self) -> ProviderResult<ServerVersion> {
        let mut grpc = self.client();
        let resp = self
            .call("GetVersion", grpc.get_version(proto::VersionReq {}))
            .await?;
        Ok(ServerVersion {
            server: resp.server,
            api: resp.api,
        })
    }
}

/// Normalize a gRPC status into the provider error taxonomy.
///
/// Network-class codes become transient errors eligible for retry;
/// authentication codes are permanent and never retried.
fn map_status(operation: &'static str, status: &tonic::Status) -> ProviderError {
    match status.code() {
        Code::Unavailable | Code::Aborted | Code::ResourceExhausted => {
            ProviderError::network(format!("{operation}: {}", status.message()))
        }
        Code::DeadlineExceeded | Code::Cancelled => ProviderError::Timeout {
            operation: operation.to_string(),
            timeout_secs: 0,
        },
        Code::Unauthenticated | Code::PermissionDenied => ProviderError::Auth {
            message: format!("{operation}: {}", status.message()),
        },
        _ => ProviderError::remote(operation, status.message()),
    }
}

fn client_to_proto(client: RemoteClient) -> proto::Client {
    proto::Client {
        id: client.id,
        secret: client.secret,
        redirect_uris: client.redirect_uris,
        trusted_peers: client.trusted_peers,
        public: client.public,
        name: client.name,
        logo_url: client.logo_url,
    }
}

fn client_from_proto(client: proto::Client) -> RemoteClient {
    RemoteClient {
        id: client.id,
        secret: client.secret,
        redirect_uris: client.redirect_uris,
        trusted_peers: client.trusted_peers,
        public: client.public,
        name: client.name,
        logo_url: client.logo_url,
    }
}

fn connector_to_proto(connector: RemoteConnector) -> ProviderResult<proto::Connector> {
    Ok(proto::Connector {
        id: connector.id,
        r#type: connector.connector_type,
        name: connector.name,
        config: serde_json::to_vec(&connector.config)?,
    })
}

fn connector_from_proto(connector: proto::Connector) -> ProviderResult<RemoteConnector> {
    let config = if connector.config.is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_slice(&connector.config)?
    };
    Ok(RemoteConnector {
        id: connector.id,
        connector_type: connector.r#type,
        name: connector.name,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_transient() {
        for code in [Code::Unavailable, Code::Aborted, Code::ResourceExhausted] {
            let err = map_status("CreateClient", &tonic::Status::new(code, "boom"));
            assert!(err.is_transient(), "{code:?} should map to transient");
        }
    }

    #[test]
    fn test_status_mapping_deadline() {
        let err = map_status(
            "DeleteClient",
            &tonic::Status::new(Code::DeadlineExceeded, "late"),
        );
        assert!(err.is_transient());
        assert_eq!(err.error_code(), "DEADLINE_EXCEEDED");
    }

    #[test]
    fn test_status_mapping_auth_is_permanent() {
        for code in [Code::Unauthenticated, Code::PermissionDenied] {
            let err = map_status("UpdateClient", &tonic::Status::new(code, "denied"));
            assert!(err.is_permanent());
            assert_eq!(err.error_code(), "AUTH_FAILED");
        }
    }

    #[test]
    fn test_status_mapping_other_is_remote() {
        let err = map_status(
            "CreateConnector",
            &tonic::Status::new(Code::Internal, "storage failure"),
        );
        assert!(err.is_permanent());
        assert_eq!(err.error_code(), "REMOTE_ERROR");
    }

    #[test]
    fn test_remote_client_debug_redacts_secret() {
        let client = RemoteClient {
            id: "web".into(),
            secret: "super-secret".into(),
            redirect_uris: vec![],
            trusted_peers: vec![],
            public: false,
            name: "Web".into(),
            logo_url: String::new(),
        };
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_connector_proto_round_trip() {
        let connector = RemoteConnector {
            id: "azure".into(),
            connector_type: "oidc".into(),
            name: "Azure AD".into(),
            config: serde_json::json!({"issuer": "https://login.example.com"}),
        };
        let proto = connector_to_proto(connector.clone()).unwrap();
        let back = connector_from_proto(proto).unwrap();
        assert_eq!(back, connector);
    }

    #[test]
    fn test_connector_from_proto_tolerates_empty_config() {
        let connector = connector_from_proto(proto::Connector {
            id: "c".into(),
            r#type: "oidc".into(),
            name: "C".into(),
            config: Vec::new(),
        })
        .unwrap();
        assert!(connector.config.is_object());
    }
}
