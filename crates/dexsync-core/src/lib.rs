//! # dexsync-core
//!
//! Resource model for the dexsync reconciliation core: typed identifiers,
//! desired-state specifications for OAuth2 clients and identity connectors,
//! the resource schema registry, secret materialization, and the provider
//! error taxonomy.
//!
//! ## Crate Organization
//!
//! - [`ids`] - Type-safe identifiers (`ClientId`, `ConnectorId`, `ResourceId`)
//! - [`resource`] - `ClientSpec` / `ConnectorSpec`, normalization, validation
//! - [`schema`] - Resource kind field contracts and the registry
//! - [`secret`] - `SecretString` and secret materialization
//! - [`error`] - Error taxonomy with transient/permanent classification

pub mod error;
pub mod ids;
pub mod resource;
pub mod schema;
pub mod secret;

/// Prelude module for convenient imports.
///
/// ```
/// use dexsync_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ProviderError, ProviderResult};
    pub use crate::ids::{ClientId, ConnectorId, ResourceId};
    pub use crate::resource::{
        AzureOidcConfig, ClientSpec, CognitoOidcConfig, ConnectorConfig, ConnectorKind,
        ConnectorSpec, GenericConfig, OidcConfig, ResourceSpec,
    };
    pub use crate::schema::{ResourceDescriptor, SchemaRegistry};
    pub use crate::secret::{materialize, SecretString};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _id = ResourceId::client("web");
        let _kind = ConnectorKind::AzureOidc;
        let _registry = SchemaRegistry::new();
        let _secret = SecretString::new("s");
        let _spec = ClientSpec::new("web", "Web App");
    }
}
