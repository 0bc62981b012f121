//! Provider error types.
//!
//! Error definitions with transient/permanent classification for retry logic.
//! Transient errors (network-class failures) are eligible for local retry;
//! everything else propagates to the per-resource result unchanged.

use thiserror::Error;

/// Error that can occur while reconciling resources against the identity
/// service.
#[derive(Debug, Error)]
pub enum ProviderError {
    // Connection errors. Failing to establish the administrative channel is
    // fatal for the whole run; no partial reconciliation proceeds without it.
    /// Failed to establish a connection to the identity service.
    #[error("connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A remote call exceeded its deadline.
    #[error("deadline exceeded after {timeout_secs} seconds during {operation}")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    /// Network error during an individual remote call.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Authentication errors are never retried.
    /// The identity service rejected the configured credentials.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Resource kind is not registered in the schema registry.
    #[error("unknown resource type: {kind}")]
    UnknownResourceType { kind: String },

    /// Create conflict that persisted after one reconciliation retry.
    #[error("conflict on {id}: remote resource already exists and could not be adopted")]
    Conflict { id: String },

    /// Remote API failure detail that does not fit a more specific class.
    #[error("remote error during {operation}: {message}")]
    Remote { operation: String, message: String },

    /// The target of an in-place update no longer exists remotely.
    #[error("update target missing: {id}")]
    TargetMissing { id: String },

    /// A replace deleted the old resource but failed to create the new one.
    ///
    /// The named resource is absent remotely and requires operator
    /// intervention; the run never retries this automatically.
    #[error("replace of {id} failed after delete; resource is orphaned: {message}")]
    PartialReplace { id: String, message: String },

    /// Malformed resource specification.
    #[error("invalid spec: {message}")]
    Validation { message: String },

    /// Spec or state could not be serialized.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl ProviderError {
    /// Check if this error is transient and the operation should be retried.
    ///
    /// Only network-class failures qualify; authentication and validation
    /// errors are never retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout { .. } | ProviderError::Network { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Whether this error aborts the whole reconciliation run rather than a
    /// single resource.
    #[must_use]
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, ProviderError::Connection { .. })
    }

    /// Get a stable error code for classification in run summaries.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            ProviderError::Connection { .. } => "CONNECTION_FAILED",
            ProviderError::Timeout { .. } => "DEADLINE_EXCEEDED",
            ProviderError::Network { .. } => "NETWORK_ERROR",
            ProviderError::Auth { .. } => "AUTH_FAILED",
            ProviderError::UnknownResourceType { .. } => "UNKNOWN_RESOURCE_TYPE",
            ProviderError::Conflict { .. } => "CONFLICT",
            ProviderError::Remote { .. } => "REMOTE_ERROR",
            ProviderError::TargetMissing { .. } => "TARGET_MISSING",
            ProviderError::PartialReplace { .. } => "PARTIAL_REPLACE_FAILURE",
            ProviderError::Validation { .. } => "VALIDATION_ERROR",
            ProviderError::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        ProviderError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source.
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ProviderError::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        ProviderError::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a deadline error for the named operation.
    pub fn timeout(operation: impl Into<String>, timeout_secs: u64) -> Self {
        ProviderError::Timeout {
            operation: operation.into(),
            timeout_secs,
        }
    }

    /// Create a remote error for the named operation.
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ProviderError::Validation {
            message: message.into(),
        }
    }

    /// Create an unknown-resource-type error.
    pub fn unknown_resource_type(kind: impl Into<String>) -> Self {
        ProviderError::UnknownResourceType { kind: kind.into() }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let transient = vec![
            ProviderError::network("connection reset"),
            ProviderError::timeout("CreateClient", 30),
        ];

        for err in transient {
            assert!(
                err.is_transient(),
                "expected {} to be transient",
                err.error_code()
            );
        }
    }

    #[test]
    fn test_permanent_errors() {
        let permanent = vec![
            ProviderError::connection("refused"),
            ProviderError::Auth {
                message: "bad certificate".into(),
            },
            ProviderError::validation("empty redirect URI set"),
            ProviderError::Conflict { id: "web".into() },
            ProviderError::unknown_resource_type("saml-connector"),
            ProviderError::PartialReplace {
                id: "connector/azure".into(),
                message: "create failed".into(),
            },
        ];

        for err in permanent {
            assert!(
                err.is_permanent(),
                "expected {} to be permanent",
                err.error_code()
            );
        }
    }

    #[test]
    fn test_connection_is_fatal_for_run() {
        assert!(ProviderError::connection("refused").is_fatal_for_run());
        assert!(!ProviderError::network("reset").is_fatal_for_run());
        assert!(!ProviderError::validation("bad").is_fatal_for_run());
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::timeout("DeleteConnector", 30);
        assert_eq!(
            err.to_string(),
            "deadline exceeded after 30 seconds during DeleteConnector"
        );

        let err = ProviderError::Conflict { id: "web".into() };
        assert!(err.to_string().contains("web"));
    }
}
