//! # dexsync-api
//!
//! Transport layer for the dexsync reconciliation core: connection
//! configuration with TLS/mTLS support, hand-written protobuf types for the
//! identity service's administrative gRPC API, and the [`client::AdminApi`]
//! trait the reconciliation engine executes against.
//!
//! ## Crate Organization
//!
//! - [`config`] - `ConnectionConfig` and TLS mode resolution
//! - [`proto`] - Protobuf message types and the raw unary client
//! - [`client`] - `AdminApi` trait, transport DTOs, gRPC implementation

pub mod client;
pub mod config;
pub mod proto;

pub use client::{
    connect, AdminApi, ClientCreation, ClientUpdate, ConnectorUpdate, GrpcAdminApi,
    RemoteClient, RemoteConnector, ServerVersion,
};
pub use config::{ConnectionConfig, TlsMode};
