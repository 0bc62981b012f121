//! Desired-state resource specifications.
//!
//! The provider manages two resource families: OAuth2 client registrations
//! and federated identity connectors. Connector configuration is a tagged
//! union discriminated by connector kind, so exhaustiveness is checked at
//! compile time instead of dispatched at runtime.
//!
//! Specs are normalized before comparison (sorted URI sets, lower-cased
//! scopes) so irrelevant ordering differences never show up as diffs.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use crate::error::{ProviderError, ProviderResult};
use crate::ids::{ClientId, ConnectorId, ResourceId};
use crate::secret::SecretString;

/// An OAuth2 relying-party registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSpec {
    /// Stable client identifier, immutable after creation.
    pub client_id: ClientId,

    /// Display label.
    pub name: String,

    /// Allowed redirect URIs. Must not be empty.
    pub redirect_uris: Vec<String>,

    /// Peer client IDs allowed to mint tokens audience-scoped to this
    /// client.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trusted_peers: Vec<String>,

    /// Public clients (native/mobile apps) authenticate without a secret.
    #[serde(default)]
    pub public: bool,

    /// Optional logo shown on consent screens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,

    /// Client secret. Absent means the provider generates one on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretString>,
}

impl ClientSpec {
    /// Create a minimal client spec.
    pub fn new(client_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client_id: ClientId::new(client_id),
            name: name.into(),
            redirect_uris: Vec::new(),
            trusted_peers: Vec::new(),
            public: false,
            logo_url: None,
            secret: None,
        }
    }

    /// Add a redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }

    /// Add a trusted peer client ID.
    #[must_use]
    pub fn with_trusted_peer(mut self, peer: impl Into<String>) -> Self {
        self.trusted_peers.push(peer.into());
        self
    }

    /// Set an explicit secret instead of provider generation.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Mark this as a public client.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Return a normalized copy: redirect URIs and trusted peers sorted and
    /// deduplicated.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut spec = self.clone();
        spec.redirect_uris.sort();
        spec.redirect_uris.dedup();
        spec.trusted_peers.sort();
        spec.trusted_peers.dedup();
        spec
    }

    /// Validate the spec.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.client_id.is_empty() {
            return Err(ProviderError::validation("client id must not be empty"));
        }
        if self.redirect_uris.is_empty() {
            return Err(ProviderError::validation(format!(
                "client {} must declare at least one redirect URI",
                self.client_id
            )));
        }
        if self.public && self.secret.is_some() {
            return Err(ProviderError::validation(format!(
                "public client {} must not carry a secret",
                self.client_id
            )));
        }
        Ok(())
    }

    /// Names of fields that differ from a previously applied spec.
    ///
    /// Both specs are expected to be normalized. The secret field only
    /// counts as changed when the caller explicitly supplies a value that
    /// differs from the stored one; an absent desired secret is never a
    /// diff against a provider-generated secret.
    #[must_use]
    pub fn changed_fields(
        &self,
        previous: &ClientSpec,
        previous_generated: Option<&SecretString>,
    ) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.name != previous.name {
            changed.push("name");
        }
        if self.redirect_uris != previous.redirect_uris {
            changed.push("redirectUris");
        }
        if self.trusted_peers != previous.trusted_peers {
            changed.push("trustedPeers");
        }
        if self.public != previous.public {
            changed.push("public");
        }
        if self.logo_url != previous.logo_url {
            changed.push("logoUrl");
        }
        if let Some(desired) = &self.secret {
            let stored = previous.secret.as_ref().or(previous_generated);
            if stored != Some(desired) {
                changed.push("secret");
            }
        }
        changed
    }
}

/// Kind of identity connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorKind {
    /// Generic OIDC upstream configured with an explicit issuer.
    Oidc,
    /// Azure AD / Entra ID tenant, lowered onto the OIDC connector.
    AzureOidc,
    /// AWS Cognito user pool, lowered onto the OIDC connector.
    CognitoOidc,
    /// Arbitrary connector type with a raw configuration payload.
    Generic,
}

impl ConnectorKind {
    /// All built-in connector kinds.
    #[must_use]
    pub fn all() -> &'static [ConnectorKind] {
        &[
            ConnectorKind::Oidc,
            ConnectorKind::AzureOidc,
            ConnectorKind::CognitoOidc,
            ConnectorKind::Generic,
        ]
    }

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorKind::Oidc => "oidc",
            ConnectorKind::AzureOidc => "azure-oidc",
            ConnectorKind::CognitoOidc => "cognito-oidc",
            ConnectorKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oidc" => Ok(ConnectorKind::Oidc),
            "azure-oidc" => Ok(ConnectorKind::AzureOidc),
            "cognito-oidc" => Ok(ConnectorKind::CognitoOidc),
            "generic" => Ok(ConnectorKind::Generic),
            other => Err(ProviderError::unknown_resource_type(other)),
        }
    }
}

/// Generic OIDC connector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcConfig {
    /// OIDC issuer URL.
    pub issuer: String,
    /// Relying-party client ID registered at the upstream.
    pub client_id: String,
    /// Relying-party client secret.
    pub client_secret: SecretString,
    /// Callback URI the identity service listens on.
    pub redirect_uri: String,
    /// Requested scopes; compared case-insensitively.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// Claim used as the username, e.g. `preferred_username`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name_key: Option<String>,
}

/// Azure AD / Entra ID connector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureOidcConfig {
    /// Azure tenant ID; determines the issuer URL.
    pub tenant_id: String,
    /// Application (client) ID of the Azure app registration.
    pub client_id: String,
    /// Client secret of the Azure app registration.
    pub client_secret: SecretString,
    /// Callback URI the identity service listens on.
    pub redirect_uri: String,
    /// Claim used as the username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name_source: Option<String>,
}

impl AzureOidcConfig {
    /// Issuer URL derived from the tenant ID.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!("https://login.microsoftonline.com/{}/v2.0", self.tenant_id)
    }
}

/// AWS Cognito connector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitoOidcConfig {
    /// AWS region hosting the user pool.
    pub region: String,
    /// Cognito user pool ID; determines the issuer URL together with the
    /// region.
    pub user_pool_id: String,
    /// App client ID in the user pool.
    pub client_id: String,
    /// App client secret in the user pool.
    pub client_secret: SecretString,
    /// Callback URI the identity service listens on.
    pub redirect_uri: String,
    /// Claim used as the username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name_source: Option<String>,
}

impl CognitoOidcConfig {
    /// Issuer URL derived from the region and user pool.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }
}

/// Raw connector configuration for kinds without a typed surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericConfig {
    /// Connector type string understood by the identity service.
    pub connector_type: String,
    /// Configuration payload passed through verbatim.
    pub config: serde_json::Value,
}

/// Connector configuration variants, discriminated by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ConnectorConfig {
    /// Generic OIDC upstream.
    Oidc(OidcConfig),
    /// Azure AD tenant.
    AzureOidc(AzureOidcConfig),
    /// AWS Cognito user pool.
    CognitoOidc(CognitoOidcConfig),
    /// Arbitrary connector type with raw config.
    Generic(GenericConfig),
}

impl ConnectorConfig {
    /// The connector kind this configuration belongs to.
    #[must_use]
    pub fn kind(&self) -> ConnectorKind {
        match self {
            ConnectorConfig::Oidc(_) => ConnectorKind::Oidc,
            ConnectorConfig::AzureOidc(_) => ConnectorKind::AzureOidc,
            ConnectorConfig::CognitoOidc(_) => ConnectorKind::CognitoOidc,
            ConnectorConfig::Generic(_) => ConnectorKind::Generic,
        }
    }
}

/// A federated identity connector registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSpec {
    /// Stable connector identifier, immutable after creation.
    pub connector_id: ConnectorId,

    /// Display label.
    pub name: String,

    /// Kind-specific configuration payload.
    pub config: ConnectorConfig,
}

impl ConnectorSpec {
    /// Create a connector spec.
    pub fn new(
        connector_id: impl Into<String>,
        name: impl Into<String>,
        config: ConnectorConfig,
    ) -> Self {
        Self {
            connector_id: ConnectorId::new(connector_id),
            name: name.into(),
            config,
        }
    }

    /// The connector kind.
    #[must_use]
    pub fn kind(&self) -> ConnectorKind {
        self.config.kind()
    }

    /// Return a normalized copy: scopes lower-cased, sorted and
    /// deduplicated.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut spec = self.clone();
        if let ConnectorConfig::Oidc(cfg) = &mut spec.config {
            for scope in &mut cfg.scopes {
                *scope = scope.to_lowercase();
            }
            cfg.scopes.sort();
            cfg.scopes.dedup();
        }
        spec
    }

    /// Validate the spec.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.connector_id.is_empty() {
            return Err(ProviderError::validation("connector id must not be empty"));
        }
        match &self.config {
            ConnectorConfig::Oidc(cfg) => {
                validate_issuer(&self.connector_id, &cfg.issuer)?;
                require(&self.connector_id, "clientId", &cfg.client_id)?;
                require(&self.connector_id, "redirectUri", &cfg.redirect_uri)?;
            }
            ConnectorConfig::AzureOidc(cfg) => {
                require(&self.connector_id, "tenantId", &cfg.tenant_id)?;
                require(&self.connector_id, "clientId", &cfg.client_id)?;
                require(&self.connector_id, "redirectUri", &cfg.redirect_uri)?;
            }
            ConnectorConfig::CognitoOidc(cfg) => {
                require(&self.connector_id, "region", &cfg.region)?;
                require(&self.connector_id, "userPoolId", &cfg.user_pool_id)?;
                require(&self.connector_id, "clientId", &cfg.client_id)?;
                require(&self.connector_id, "redirectUri", &cfg.redirect_uri)?;
            }
            ConnectorConfig::Generic(cfg) => {
                require(&self.connector_id, "type", &cfg.connector_type)?;
                if !cfg.config.is_object() {
                    return Err(ProviderError::validation(format!(
                        "connector {}: generic config must be a JSON object",
                        self.connector_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Names of fields that differ from a previously applied spec.
    ///
    /// Both specs are expected to be normalized. A kind change reports
    /// `type`; payload differences within the same kind report `config`.
    #[must_use]
    pub fn changed_fields(&self, previous: &ConnectorSpec) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.name != previous.name {
            changed.push("name");
        }
        if self.kind() != previous.kind() {
            changed.push("type");
        } else if self.config != previous.config {
            changed.push("config");
        }
        changed
    }

    /// Connector type string sent over the wire.
    ///
    /// The Azure and Cognito kinds are sugar over the identity service's
    /// OIDC connector; only the generic kind carries its own type.
    #[must_use]
    pub fn wire_type(&self) -> &str {
        match &self.config {
            ConnectorConfig::Oidc(_)
            | ConnectorConfig::AzureOidc(_)
            | ConnectorConfig::CognitoOidc(_) => "oidc",
            ConnectorConfig::Generic(cfg) => &cfg.connector_type,
        }
    }

    /// Configuration payload sent over the wire, with plaintext secrets.
    ///
    /// This is the one serialization path that intentionally unmasks
    /// connector credentials: the payload goes to the identity service
    /// only, never to logs or state.
    pub fn wire_config(&self) -> ProviderResult<serde_json::Value> {
        let value = match &self.config {
            ConnectorConfig::Oidc(cfg) => oidc_wire_config(
                &cfg.issuer,
                &cfg.client_id,
                &cfg.client_secret,
                &cfg.redirect_uri,
                &cfg.scopes,
                cfg.user_name_key.as_deref(),
            ),
            ConnectorConfig::AzureOidc(cfg) => oidc_wire_config(
                &cfg.issuer(),
                &cfg.client_id,
                &cfg.client_secret,
                &cfg.redirect_uri,
                &[],
                cfg.user_name_source.as_deref(),
            ),
            ConnectorConfig::CognitoOidc(cfg) => oidc_wire_config(
                &cfg.issuer(),
                &cfg.client_id,
                &cfg.client_secret,
                &cfg.redirect_uri,
                &[],
                cfg.user_name_source.as_deref(),
            ),
            ConnectorConfig::Generic(cfg) => cfg.config.clone(),
        };
        Ok(value)
    }
}

fn oidc_wire_config(
    issuer: &str,
    client_id: &str,
    client_secret: &SecretString,
    redirect_uri: &str,
    scopes: &[String],
    user_name_key: Option<&str>,
) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("issuer".into(), json!(issuer));
    map.insert("clientID".into(), json!(client_id));
    map.insert("clientSecret".into(), json!(client_secret.expose()));
    map.insert("redirectURI".into(), json!(redirect_uri));
    if !scopes.is_empty() {
        map.insert("scopes".into(), json!(scopes));
    }
    if let Some(key) = user_name_key {
        map.insert("userNameKey".into(), json!(key));
    }
    serde_json::Value::Object(map)
}

fn require(id: &ConnectorId, field: &str, value: &str) -> ProviderResult<()> {
    if value.is_empty() {
        return Err(ProviderError::validation(format!(
            "connector {id}: {field} must not be empty"
        )));
    }
    Ok(())
}

fn validate_issuer(id: &ConnectorId, issuer: &str) -> ProviderResult<()> {
    let parsed = url::Url::parse(issuer).map_err(|e| {
        ProviderError::validation(format!("connector {id}: invalid issuer URL: {e}"))
    })?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(ProviderError::validation(format!(
            "connector {id}: issuer must be an http(s) URL"
        )));
    }
    Ok(())
}

/// A desired-state resource of either family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "resource")]
pub enum ResourceSpec {
    /// OAuth2 client registration.
    Client(ClientSpec),
    /// Identity connector.
    Connector(ConnectorSpec),
}

impl ResourceSpec {
    /// The namespaced identifier of this resource.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        match self {
            ResourceSpec::Client(spec) => ResourceId::Client(spec.client_id.clone()),
            ResourceSpec::Connector(spec) => ResourceId::Connector(spec.connector_id.clone()),
        }
    }

    /// Registry name of this resource's kind.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            ResourceSpec::Client(_) => "client",
            ResourceSpec::Connector(spec) => spec.kind().as_str(),
        }
    }

    /// Return a normalized copy.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self {
            ResourceSpec::Client(spec) => ResourceSpec::Client(spec.normalized()),
            ResourceSpec::Connector(spec) => ResourceSpec::Connector(spec.normalized()),
        }
    }

    /// Validate the spec.
    pub fn validate(&self) -> ProviderResult<()> {
        match self {
            ResourceSpec::Client(spec) => spec.validate(),
            ResourceSpec::Connector(spec) => spec.validate(),
        }
    }
}

impl From<ClientSpec> for ResourceSpec {
    fn from(spec: ClientSpec) -> Self {
        ResourceSpec::Client(spec)
    }
}

impl From<ConnectorSpec> for ResourceSpec {
    fn from(spec: ConnectorSpec) -> Self {
        ResourceSpec::Connector(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oidc_connector(id: &str) -> ConnectorSpec {
        ConnectorSpec::new(
            id,
            "Generic OIDC",
            ConnectorConfig::Oidc(OidcConfig {
                issuer: "https://issuer.example.com".into(),
                client_id: "upstream-client".into(),
                client_secret: SecretString::new("upstream-secret"),
                redirect_uri: "http://localhost:5556/dex/callback".into(),
                scopes: vec!["OpenID".into(), "email".into(), "openid".into()],
                user_name_key: None,
            }),
        )
    }

    #[test]
    fn test_client_normalization_sorts_and_dedups() {
        let spec = ClientSpec::new("web", "Web App")
            .with_redirect_uri("http://b.example.com/cb")
            .with_redirect_uri("http://a.example.com/cb")
            .with_redirect_uri("http://b.example.com/cb");

        let normalized = spec.normalized();
        assert_eq!(
            normalized.redirect_uris,
            vec!["http://a.example.com/cb", "http://b.example.com/cb"]
        );
    }

    #[test]
    fn test_connector_normalization_lowercases_scopes() {
        let normalized = oidc_connector("c1").normalized();
        let ConnectorConfig::Oidc(cfg) = &normalized.config else {
            panic!("expected oidc config");
        };
        assert_eq!(cfg.scopes, vec!["email", "openid"]);
    }

    #[test]
    fn test_client_requires_redirect_uri() {
        let spec = ClientSpec::new("web", "Web App");
        let err = spec.validate().unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_public_client_rejects_secret() {
        let spec = ClientSpec::new("cli", "CLI")
            .with_redirect_uri("urn:ietf:wg:oauth:2.0:oob")
            .with_secret("nope")
            .public();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_client_changed_fields_ignores_generated_secret() {
        let desired = ClientSpec::new("web", "Web App")
            .with_redirect_uri("http://localhost:3000/callback")
            .normalized();
        let mut applied = desired.clone();
        applied.secret = None;
        let generated = SecretString::new("generated-by-provider");

        let changed = desired.changed_fields(&applied, Some(&generated));
        assert!(changed.is_empty(), "unexpected diff: {changed:?}");
    }

    #[test]
    fn test_client_changed_fields_detects_explicit_secret_rotation() {
        let applied = ClientSpec::new("web", "Web App")
            .with_redirect_uri("http://localhost:3000/callback")
            .normalized();
        let generated = SecretString::new("generated-by-provider");

        let desired = applied.clone().with_secret("caller-rotated");
        let changed = desired.changed_fields(&applied, Some(&generated));
        assert_eq!(changed, vec!["secret"]);
    }

    #[test]
    fn test_connector_kind_change_reports_type() {
        let oidc = oidc_connector("azure-tenant").normalized();
        let azure = ConnectorSpec::new(
            "azure-tenant",
            "Azure AD",
            ConnectorConfig::AzureOidc(AzureOidcConfig {
                tenant_id: "tid".into(),
                client_id: "cid".into(),
                client_secret: SecretString::new("s"),
                redirect_uri: "http://localhost:5556/dex/callback".into(),
                user_name_source: None,
            }),
        )
        .normalized();

        let changed = azure.changed_fields(&oidc);
        assert!(changed.contains(&"type"));
        assert!(!changed.contains(&"config"));
    }

    #[test]
    fn test_azure_issuer_lowering() {
        let cfg = AzureOidcConfig {
            tenant_id: "my-tenant".into(),
            client_id: "cid".into(),
            client_secret: SecretString::new("s"),
            redirect_uri: "http://localhost:5556/dex/callback".into(),
            user_name_source: Some("preferred_username".into()),
        };
        assert_eq!(
            cfg.issuer(),
            "https://login.microsoftonline.com/my-tenant/v2.0"
        );
    }

    #[test]
    fn test_cognito_issuer_lowering() {
        let cfg = CognitoOidcConfig {
            region: "us-east-1".into(),
            user_pool_id: "us-east-1_ABC123".into(),
            client_id: "cid".into(),
            client_secret: SecretString::new("s"),
            redirect_uri: "http://localhost:5556/dex/callback".into(),
            user_name_source: None,
        };
        assert_eq!(
            cfg.issuer(),
            "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_ABC123"
        );
    }

    #[test]
    fn test_wire_config_carries_plaintext_secret() {
        let spec = oidc_connector("c1");
        let wire = spec.wire_config().unwrap();
        assert_eq!(wire["clientSecret"], "upstream-secret");
        assert_eq!(wire["issuer"], "https://issuer.example.com");
        assert_eq!(spec.wire_type(), "oidc");
    }

    #[test]
    fn test_spec_serialization_redacts_secrets() {
        let spec = oidc_connector("c1");
        let json = serde_json::to_string(&spec).unwrap();
        assert!(!json.contains("upstream-secret"));
        assert!(json.contains("<redacted>"));
    }

    #[test]
    fn test_generic_config_requires_object() {
        let spec = ConnectorSpec::new(
            "ldap",
            "LDAP",
            ConnectorConfig::Generic(GenericConfig {
                connector_type: "ldap".into(),
                config: json!("not-an-object"),
            }),
        );
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_connector_config_tagged_serialization() {
        let spec = oidc_connector("c1");
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["config"]["type"], "oidc");
    }
}
