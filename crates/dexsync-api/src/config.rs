//! Connection configuration for the administrative endpoint.
//!
//! One [`ConnectionConfig`] describes how a reconciliation run reaches the
//! identity service: the `host:port` of the gRPC endpoint plus optional TLS
//! material. It is constructed once per run and never mutated mid-run.

use serde::{Deserialize, Serialize};

use dexsync_core::error::{ProviderError, ProviderResult};
use dexsync_core::secret::SecretString;

fn default_timeout_seconds() -> u64 {
    30
}

fn default_connect_timeout_seconds() -> u64 {
    5
}

/// How the administrative channel is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Plaintext channel. Development only.
    Insecure,
    /// TLS with server certificate validation against the configured CA
    /// (or the system roots when none is configured).
    ServerOnly,
    /// Mutual TLS: server validation plus a client certificate.
    Mutual,
}

impl TlsMode {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::Insecure => "insecure",
            TlsMode::ServerOnly => "server-only",
            TlsMode::Mutual => "mutual",
        }
    }
}

impl std::fmt::Display for TlsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide configuration for reaching the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// gRPC endpoint as `host:port`, e.g. `dex.internal.example.com:5557`.
    pub host: String,

    /// Disable TLS entirely and connect over plaintext. Development only;
    /// mutually exclusive with any TLS material below.
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// PEM-encoded CA certificate for validating the server certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<String>,

    /// PEM-encoded client certificate for mutual TLS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert: Option<String>,

    /// PEM-encoded private key for the client certificate. Redacted in all
    /// serialization and logging paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<SecretString>,

    /// Per-RPC deadline in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Deadline for establishing the channel, in seconds.
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

impl ConnectionConfig {
    /// Create a configuration for the given endpoint with defaults for
    /// everything else.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            insecure_skip_verify: false,
            ca_cert: None,
            client_cert: None,
            client_key: None,
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }

    /// Use a plaintext channel (development only).
    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.insecure_skip_verify = true;
        self
    }

    /// Validate the server certificate against this CA.
    #[must_use]
    pub fn with_ca_cert(mut self, pem: impl Into<String>) -> Self {
        self.ca_cert = Some(pem.into());
        self
    }

    /// Present a client certificate for mutual TLS.
    #[must_use]
    pub fn with_client_identity(
        mut self,
        cert_pem: impl Into<String>,
        key_pem: impl Into<SecretString>,
    ) -> Self {
        self.client_cert = Some(cert_pem.into());
        self.client_key = Some(key_pem.into());
        self
    }

    /// Override the per-RPC deadline.
    #[must_use]
    pub fn with_timeout_seconds(mut self, secs: u64) -> Self {
        self.timeout_seconds = secs;
        self
    }

    /// Per-RPC deadline as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }

    /// Channel establishment deadline as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Resolve the TLS mode, validating option consistency.
    ///
    /// Rules, matching the provider's configuration contract:
    /// - `host` is required;
    /// - `clientCert` and `clientKey` must be supplied together;
    /// - `insecureSkipVerify` selects a plaintext channel and cannot be
    ///   combined with TLS material;
    /// - any TLS material selects TLS, with mutual TLS when a client
    ///   identity is present.
    pub fn tls_mode(&self) -> ProviderResult<TlsMode> {
        if self.host.is_empty() {
            return Err(ProviderError::validation("host is required"));
        }

        let has_identity = match (&self.client_cert, &self.client_key) {
            (Some(cert), Some(key)) if !cert.is_empty() && !key.is_empty() => true,
            (None, None) => false,
            _ => {
                return Err(ProviderError::validation(
                    "clientCert and clientKey must be provided together (and non-empty) for mutual TLS",
                ))
            }
        };
        let has_ca = self.ca_cert.as_ref().is_some_and(|ca| !ca.is_empty());

        if self.insecure_skip_verify {
            if has_identity || has_ca {
                return Err(ProviderError::validation(
                    "insecureSkipVerify cannot be combined with TLS material",
                ));
            }
            return Ok(TlsMode::Insecure);
        }

        if has_identity {
            Ok(TlsMode::Mutual)
        } else if has_ca {
            Ok(TlsMode::ServerOnly)
        } else {
            // No TLS material at all: plaintext, matching the identity
            // service's local-development examples.
            Ok(TlsMode::Insecure)
        }
    }

    /// Endpoint URI for the underlying channel.
    pub fn endpoint_uri(&self) -> ProviderResult<String> {
        let scheme = match self.tls_mode()? {
            TlsMode::Insecure => "http",
            TlsMode::ServerOnly | TlsMode::Mutual => "https",
        };
        Ok(format!("{scheme}://{}", self.host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::new("dex.internal:5557");
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.connect_timeout_seconds, 5);
        assert!(!config.insecure_skip_verify);
    }

    #[test]
    fn test_empty_host_rejected() {
        let config = ConnectionConfig::new("");
        assert!(config.tls_mode().is_err());
    }

    #[test]
    fn test_plaintext_without_material() {
        let config = ConnectionConfig::new("localhost:5557");
        assert_eq!(config.tls_mode().unwrap(), TlsMode::Insecure);
        assert_eq!(config.endpoint_uri().unwrap(), "http://localhost:5557");
    }

    #[test]
    fn test_server_only_with_ca() {
        let config = ConnectionConfig::new("dex.internal:5557").with_ca_cert("CA PEM");
        assert_eq!(config.tls_mode().unwrap(), TlsMode::ServerOnly);
        assert_eq!(config.endpoint_uri().unwrap(), "https://dex.internal:5557");
    }

    #[test]
    fn test_mutual_requires_both_halves() {
        let mut config = ConnectionConfig::new("dex.internal:5557");
        config.client_cert = Some("CERT PEM".into());
        assert!(config.tls_mode().is_err());

        let config = ConnectionConfig::new("dex.internal:5557")
            .with_client_identity("CERT PEM", "KEY PEM");
        assert_eq!(config.tls_mode().unwrap(), TlsMode::Mutual);
    }

    #[test]
    fn test_insecure_conflicts_with_material() {
        let config = ConnectionConfig::new("dex.internal:5557")
            .with_ca_cert("CA PEM")
            .insecure();
        assert!(config.tls_mode().is_err());
    }

    #[test]
    fn test_client_key_redacted_in_serialization() {
        let config = ConnectionConfig::new("dex.internal:5557")
            .with_client_identity("CERT PEM", "PRIVATE KEY PEM");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("PRIVATE KEY PEM"));
        assert!(json.contains("CERT PEM"));
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"host":"localhost:5557","insecureSkipVerify":true}"#)
                .unwrap();
        assert!(config.insecure_skip_verify);
        assert_eq!(config.timeout_seconds, 30);
    }
}
