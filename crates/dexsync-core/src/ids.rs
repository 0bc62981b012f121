//! Type-safe resource identifiers.
//!
//! Dex resource identifiers are caller-chosen strings, stable for the
//! lifetime of the resource. Newtype wrappers keep client and connector
//! namespaces from being mixed up at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier of an OAuth2 client registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wrap an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ClientId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Unique identifier of an identity connector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(String);

impl ConnectorId {
    /// Wrap an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConnectorId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ConnectorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of any managed resource, namespaced by resource family.
///
/// A client and a connector may legally share the same raw identifier
/// string; the namespace keeps them distinct in state stores and
/// dependency graphs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "family", content = "id")]
pub enum ResourceId {
    /// An OAuth2 client registration.
    Client(ClientId),
    /// An identity connector configuration.
    Connector(ConnectorId),
}

impl ResourceId {
    /// Build a client resource identifier.
    pub fn client(id: impl Into<String>) -> Self {
        Self::Client(ClientId::new(id))
    }

    /// Build a connector resource identifier.
    pub fn connector(id: impl Into<String>) -> Self {
        Self::Connector(ConnectorId::new(id))
    }

    /// The raw identifier string without its namespace.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            ResourceId::Client(id) => id.as_str(),
            ResourceId::Connector(id) => id.as_str(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Client(id) => write!(f, "client/{id}"),
            ResourceId::Connector(id) => write!(f, "connector/{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_across_namespaces() {
        let client = ResourceId::client("web");
        let connector = ResourceId::connector("web");
        assert_ne!(client, connector);
        assert_eq!(client.raw(), connector.raw());
    }

    #[test]
    fn test_display_includes_namespace() {
        assert_eq!(ResourceId::client("web").to_string(), "client/web");
        assert_eq!(ResourceId::connector("azure").to_string(), "connector/azure");
    }

    #[test]
    fn test_serde_transparent_client_id() {
        let id = ClientId::new("web-app");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"web-app\"");
        let parsed: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
