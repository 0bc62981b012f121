//! Resource schema registry.
//!
//! Declares the field contract of every manageable resource kind:
//! which fields are required, which are optional, and which cannot be
//! changed in place. The diff engine consults the registry to decide
//! whether a change is update-in-place or forces a replace.
//!
//! Lookups are pure; the registry never talks to the network.

use std::collections::HashMap;

use crate::error::{ProviderError, ProviderResult};

/// Field contract for one resource kind.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// Registry name of the kind, e.g. `client` or `azure-oidc`.
    pub kind: String,
    /// Fields that must be present in a valid spec.
    pub required_fields: Vec<&'static str>,
    /// Fields that may be present.
    pub optional_fields: Vec<&'static str>,
    /// Fields that cannot change without deleting and recreating the
    /// resource.
    pub immutable_fields: Vec<&'static str>,
}

impl ResourceDescriptor {
    /// Create a descriptor.
    pub fn new(
        kind: impl Into<String>,
        required_fields: Vec<&'static str>,
        optional_fields: Vec<&'static str>,
        immutable_fields: Vec<&'static str>,
    ) -> Self {
        Self {
            kind: kind.into(),
            required_fields,
            optional_fields,
            immutable_fields,
        }
    }

    /// Check whether a field forces replace when changed.
    #[must_use]
    pub fn is_immutable(&self, field: &str) -> bool {
        self.immutable_fields.contains(&field)
    }
}

/// Registry of manageable resource kinds.
///
/// Built-in kinds cover the OAuth2 client and the connector variants;
/// additional kinds can be registered by embedders.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    descriptors: HashMap<String, ResourceDescriptor>,
}

impl SchemaRegistry {
    /// Create a registry with the built-in resource kinds.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            descriptors: HashMap::new(),
        };
        registry.register(ResourceDescriptor::new(
            "client",
            vec!["clientId", "name", "redirectUris"],
            vec!["trustedPeers", "public", "logoUrl", "secret"],
            vec!["clientId", "public"],
        ));
        registry.register(ResourceDescriptor::new(
            "oidc",
            vec![
                "connectorId",
                "name",
                "issuer",
                "clientId",
                "clientSecret",
                "redirectUri",
            ],
            vec!["scopes", "userNameKey"],
            vec!["connectorId", "type"],
        ));
        registry.register(ResourceDescriptor::new(
            "azure-oidc",
            vec![
                "connectorId",
                "name",
                "tenantId",
                "clientId",
                "clientSecret",
                "redirectUri",
            ],
            vec!["userNameSource"],
            vec!["connectorId", "type"],
        ));
        registry.register(ResourceDescriptor::new(
            "cognito-oidc",
            vec![
                "connectorId",
                "name",
                "region",
                "userPoolId",
                "clientId",
                "clientSecret",
                "redirectUri",
            ],
            vec!["userNameSource"],
            vec!["connectorId", "type"],
        ));
        registry.register(ResourceDescriptor::new(
            "generic",
            vec!["connectorId", "name", "type", "config"],
            vec![],
            vec!["connectorId", "type"],
        ));
        registry
    }

    /// Create an empty registry with no kinds registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Register or replace a resource kind.
    pub fn register(&mut self, descriptor: ResourceDescriptor) {
        self.descriptors
            .insert(descriptor.kind.clone(), descriptor);
    }

    /// Look up the field contract for a resource kind.
    ///
    /// Fails with [`ProviderError::UnknownResourceType`] for unregistered
    /// kinds; this is surfaced to the caller, never retried.
    pub fn describe(&self, kind: &str) -> ProviderResult<&ResourceDescriptor> {
        self.descriptors
            .get(kind)
            .ok_or_else(|| ProviderError::unknown_resource_type(kind))
    }

    /// Names of all registered kinds.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds_registered() {
        let registry = SchemaRegistry::new();
        assert_eq!(
            registry.kinds(),
            vec!["azure-oidc", "client", "cognito-oidc", "generic", "oidc"]
        );
    }

    #[test]
    fn test_client_contract() {
        let registry = SchemaRegistry::new();
        let descriptor = registry.describe("client").unwrap();
        assert!(descriptor.required_fields.contains(&"redirectUris"));
        assert!(descriptor.is_immutable("clientId"));
        assert!(descriptor.is_immutable("public"));
        assert!(!descriptor.is_immutable("secret"));
        assert!(!descriptor.is_immutable("redirectUris"));
    }

    #[test]
    fn test_connector_type_is_immutable() {
        let registry = SchemaRegistry::new();
        for kind in ["oidc", "azure-oidc", "cognito-oidc", "generic"] {
            let descriptor = registry.describe(kind).unwrap();
            assert!(descriptor.is_immutable("type"), "{kind} type must be immutable");
            assert!(descriptor.is_immutable("connectorId"));
        }
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let registry = SchemaRegistry::new();
        let err = registry.describe("saml-connector").unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_RESOURCE_TYPE");
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = SchemaRegistry::empty();
        assert!(registry.describe("client").is_err());

        registry.register(ResourceDescriptor::new(
            "client",
            vec!["clientId"],
            vec![],
            vec!["clientId"],
        ));
        assert!(registry.describe("client").is_ok());
    }
}
