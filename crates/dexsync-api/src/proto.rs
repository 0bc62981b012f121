//! Protobuf types for the Dex administrative gRPC API.
//!
//! Hand-written equivalents of the `api.Dex` service surface this provider
//! uses, kept in sync with the upstream proto definition. Create responses
//! report idempotency conflicts through `already_exists`; update and delete
//! responses report missing targets through `not_found`. Empty fields in
//! update requests leave the remote value unchanged.

#![allow(clippy::all)]

/// An OAuth2 client registration as stored by the identity service.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Client {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub secret: String,
    #[prost(string, repeated, tag = "3")]
    pub redirect_uris: Vec<String>,
    #[prost(string, repeated, tag = "4")]
    pub trusted_peers: Vec<String>,
    #[prost(bool, tag = "5")]
    pub public: bool,
    #[prost(string, tag = "6")]
    pub name: String,
    #[prost(string, tag = "7")]
    pub logo_url: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateClientReq {
    #[prost(message, optional, tag = "1")]
    pub client: Option<Client>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateClientResp {
    #[prost(bool, tag = "1")]
    pub already_exists: bool,
    #[prost(message, optional, tag = "2")]
    pub client: Option<Client>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetClientReq {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetClientResp {
    #[prost(message, optional, tag = "1")]
    pub client: Option<Client>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateClientReq {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, repeated, tag = "2")]
    pub redirect_uris: Vec<String>,
    #[prost(string, repeated, tag = "3")]
    pub trusted_peers: Vec<String>,
    #[prost(string, tag = "4")]
    pub name: String,
    #[prost(string, tag = "5")]
    pub logo_url: String,
    #[prost(string, tag = "6")]
    pub new_secret: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateClientResp {
    #[prost(bool, tag = "1")]
    pub not_found: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteClientReq {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteClientResp {
    #[prost(bool, tag = "1")]
    pub not_found: bool,
}

/// A federated identity connector as stored by the identity service.
///
/// The `config` payload is connector-type-specific JSON.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Connector {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub r#type: String,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(bytes = "vec", tag = "4")]
    pub config: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateConnectorReq {
    #[prost(message, optional, tag = "1")]
    pub connector: Option<Connector>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateConnectorResp {
    #[prost(bool, tag = "1")]
    pub already_exists: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateConnectorReq {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub new_type: String,
    #[prost(string, tag = "3")]
    pub new_name: String,
    #[prost(bytes = "vec", tag = "4")]
    pub new_config: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateConnectorResp {
    #[prost(bool, tag = "1")]
    pub not_found: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteConnectorReq {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteConnectorResp {
    #[prost(bool, tag = "1")]
    pub not_found: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListConnectorsReq {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListConnectorsResp {
    #[prost(message, repeated, tag = "1")]
    pub connectors: Vec<Connector>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionReq {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionResp {
    #[prost(string, tag = "1")]
    pub server: String,
    #[prost(int32, tag = "2")]
    pub api: i32,
}

/// Hand-written unary client for the `api.Dex` service.
pub mod dex_client {
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct DexClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl DexClient<tonic::transport::Channel> {
        pub fn new(channel: tonic::transport::Channel) -> Self {
            let inner = tonic::client::Grpc::new(channel);
            Self { inner }
        }
    }

    impl<T> DexClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
    {
        pub async fn create_client(
            &mut self,
            request: impl tonic::IntoRequest<super::CreateClientReq>,
        ) -> std::result::Result<tonic::Response<super::CreateClientResp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/api.Dex/CreateClient");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn get_client(
            &mut self,
            request: impl tonic::IntoRequest<super::GetClientReq>,
        ) -> std::result::Result<tonic::Response<super::GetClientResp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/api.Dex/GetClient");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn update_client(
            &mut self,
            request: impl tonic::IntoRequest<super::UpdateClientReq>,
        ) -> std::result::Result<tonic::Response<super::UpdateClientResp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/api.Dex/UpdateClient");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn delete_client(
            &mut self,
            request: impl tonic::IntoRequest<super::DeleteClientReq>,
        ) -> std::result::Result<tonic::Response<super::DeleteClientResp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/api.Dex/DeleteClient");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn create_connector(
            &mut self,
            request: impl tonic::IntoRequest<super::CreateConnectorReq>,
        ) -> std::result::Result<tonic::Response<super::CreateConnectorResp>, tonic::Status>
        {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/api.Dex/CreateConnector");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn update_connector(
            &mut self,
            request: impl tonic::IntoRequest<super::UpdateConnectorReq>,
        ) -> std::result::Result<tonic::Response<super::UpdateConnectorResp>, tonic::Status>
        {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/api.Dex/UpdateConnector");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn delete_connector(
            &mut self,
            request: impl tonic::IntoRequest<super::DeleteConnectorReq>,
        ) -> std::result::Result<tonic::Response<super::DeleteConnectorResp>, tonic::Status>
        {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/api.Dex/DeleteConnector");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn list_connectors(
            &mut self,
            request: impl tonic::IntoRequest<super::ListConnectorsReq>,
        ) -> std::result::Result<tonic::Response<super::ListConnectorsResp>, tonic::Status>
        {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/api.Dex/ListConnectors");
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn get_version(
            &mut self,
            request: impl tonic::IntoRequest<super::VersionReq>,
        ) -> std::result::Result<tonic::Response<super::VersionResp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/api.Dex/GetVersion");
            self.inner.unary(request.into_request(), path, codec).await
        }
    }
}
