//! Plan computation: desired spec vs stored state.
//!
//! The planner turns one resource's desired spec and last-known state into
//! a single [`Operation`]. Specs are normalized before comparison so
//! redirect-URI ordering and scope casing never produce spurious diffs, and
//! changed fields are classified against the schema registry: a change to
//! any immutable field forces [`Operation::Replace`], which always wins
//! over accumulated in-place changes.

use serde::{Deserialize, Serialize};
use std::fmt;

use dexsync_core::error::ProviderResult;
use dexsync_core::resource::ResourceSpec;
use dexsync_core::schema::SchemaRegistry;

use crate::state::ResourceState;

/// The minimal remote operation needed to converge one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Operation {
    /// Desired and stored specs are equal under normalized comparison.
    NoOp,
    /// No stored state; create the resource remotely.
    Create,
    /// Apply only the named fields in place.
    UpdateInPlace { fields: Vec<String> },
    /// Delete then recreate; at least one changed field is immutable.
    Replace { fields: Vec<String> },
    /// Desired state no longer contains the resource.
    Delete,
}

impl Operation {
    /// Short name for logs and summaries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::NoOp => "noop",
            Operation::Create => "create",
            Operation::UpdateInPlace { .. } => "update",
            Operation::Replace { .. } => "replace",
            Operation::Delete => "delete",
        }
    }

    /// Whether executing this operation touches the remote service.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        !matches!(self, Operation::NoOp)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes operations from desired/current pairs.
#[derive(Debug, Clone)]
pub struct Planner {
    registry: SchemaRegistry,
}

impl Planner {
    /// Create a planner over the given schema registry.
    #[must_use]
    pub fn new(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    /// The registry this planner classifies fields against.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Compute the operation for one resource.
    ///
    /// `desired` is the declared spec (absent when the resource was removed
    /// from desired state); `current` is the stored record of the last
    /// apply (absent before the first one).
    pub fn plan(
        &self,
        desired: Option<&ResourceSpec>,
        current: Option<&ResourceState>,
    ) -> ProviderResult<Operation> {
        let Some(desired) = desired else {
            return Ok(match current {
                Some(_) => Operation::Delete,
                None => Operation::NoOp,
            });
        };

        // Unknown kinds surface before any remote call is attempted.
        let descriptor = self.registry.describe(desired.kind_name())?;

        let Some(current) = current else {
            return Ok(Operation::Create);
        };

        let desired = desired.normalized();
        let fields: Vec<String> = match (&desired, &current.spec) {
            (ResourceSpec::Client(want), ResourceSpec::Client(have)) => want
                .changed_fields(have, current.generated_secret.as_ref())
                .into_iter()
                .map(str::to_string)
                .collect(),
            (ResourceSpec::Connector(want), ResourceSpec::Connector(have)) => want
                .changed_fields(have)
                .into_iter()
                .map(str::to_string)
                .collect(),
            // A family mismatch under one identifier cannot be reconciled
            // in place.
            _ => vec!["resource".to_string()],
        };

        if fields.is_empty() {
            return Ok(Operation::NoOp);
        }

        let forces_replace = fields
            .iter()
            .any(|field| field == "resource" || descriptor.is_immutable(field));

        Ok(if forces_replace {
            Operation::Replace { fields }
        } else {
            Operation::UpdateInPlace { fields }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexsync_core::resource::{
        AzureOidcConfig, ClientSpec, ConnectorConfig, ConnectorSpec, OidcConfig,
    };
    use dexsync_core::secret::SecretString;

    fn planner() -> Planner {
        Planner::new(SchemaRegistry::new())
    }

    fn client(id: &str) -> ClientSpec {
        ClientSpec::new(id, "Web App")
            .with_redirect_uri("http://localhost:3000/callback")
            .with_redirect_uri("http://app.example.com/callback")
    }

    fn oidc(id: &str) -> ConnectorSpec {
        ConnectorSpec::new(
            id,
            "Upstream",
            ConnectorConfig::Oidc(OidcConfig {
                issuer: "https://issuer.example.com".into(),
                client_id: "rp".into(),
                client_secret: SecretString::new("s"),
                redirect_uri: "http://localhost:5556/dex/callback".into(),
                scopes: vec!["openid".into(), "email".into()],
                user_name_key: None,
            }),
        )
    }

    fn applied(spec: ResourceSpec, generated: Option<&str>) -> ResourceState {
        ResourceState::new(spec.normalized(), generated.map(SecretString::new))
    }

    #[test]
    fn test_self_diff_is_noop() {
        let spec = ResourceSpec::Client(client("web"));
        let state = applied(spec.clone(), None);
        let op = planner().plan(Some(&spec), Some(&state)).unwrap();
        assert_eq!(op, Operation::NoOp);
    }

    #[test]
    fn test_redirect_uri_order_is_not_a_diff() {
        let spec = ResourceSpec::Client(client("web"));
        let state = applied(spec.clone(), None);

        let mut reordered = client("web");
        reordered.redirect_uris.reverse();
        let op = planner()
            .plan(Some(&ResourceSpec::Client(reordered)), Some(&state))
            .unwrap();
        assert_eq!(op, Operation::NoOp);
    }

    #[test]
    fn test_scope_casing_is_not_a_diff() {
        let spec = ResourceSpec::Connector(oidc("c1"));
        let state = applied(spec.clone(), None);

        let mut recased = oidc("c1");
        if let ConnectorConfig::Oidc(cfg) = &mut recased.config {
            cfg.scopes = vec!["OpenID".into(), "Email".into()];
        }
        let op = planner()
            .plan(Some(&ResourceSpec::Connector(recased)), Some(&state))
            .unwrap();
        assert_eq!(op, Operation::NoOp);
    }

    #[test]
    fn test_absent_current_creates() {
        let spec = ResourceSpec::Client(client("web"));
        assert_eq!(planner().plan(Some(&spec), None).unwrap(), Operation::Create);
    }

    #[test]
    fn test_absent_desired_deletes() {
        let state = applied(ResourceSpec::Client(client("web")), None);
        assert_eq!(planner().plan(None, Some(&state)).unwrap(), Operation::Delete);
        assert_eq!(planner().plan(None, None).unwrap(), Operation::NoOp);
    }

    #[test]
    fn test_mutable_change_updates_in_place() {
        let state = applied(ResourceSpec::Client(client("web")), None);
        let mut renamed = client("web");
        renamed.name = "Renamed".into();
        let op = planner()
            .plan(Some(&ResourceSpec::Client(renamed)), Some(&state))
            .unwrap();
        assert_eq!(
            op,
            Operation::UpdateInPlace {
                fields: vec!["name".into()]
            }
        );
    }

    #[test]
    fn test_immutable_change_forces_replace() {
        let state = applied(ResourceSpec::Client(client("web")), None);
        let mut flipped = client("web");
        flipped.name = "Renamed".into();
        flipped.public = true;
        flipped.secret = None;
        let op = planner()
            .plan(Some(&ResourceSpec::Client(flipped)), Some(&state))
            .unwrap();
        // Replace wins over the accumulated in-place rename.
        let Operation::Replace { fields } = op else {
            panic!("expected replace, got {op:?}");
        };
        assert!(fields.contains(&"public".to_string()));
        assert!(fields.contains(&"name".to_string()));
    }

    #[test]
    fn test_connector_type_change_forces_replace() {
        let state = applied(ResourceSpec::Connector(oidc("azure-tenant")), None);
        let azure = ConnectorSpec::new(
            "azure-tenant",
            "Upstream",
            ConnectorConfig::AzureOidc(AzureOidcConfig {
                tenant_id: "tid".into(),
                client_id: "rp".into(),
                client_secret: SecretString::new("s"),
                redirect_uri: "http://localhost:5556/dex/callback".into(),
                user_name_source: None,
            }),
        );
        let op = planner()
            .plan(Some(&ResourceSpec::Connector(azure)), Some(&state))
            .unwrap();
        assert!(matches!(op, Operation::Replace { .. }));
    }

    #[test]
    fn test_generated_secret_is_not_a_diff() {
        let spec = ResourceSpec::Client(client("web"));
        let state = applied(spec.clone(), Some("provider-generated"));
        let op = planner().plan(Some(&spec), Some(&state)).unwrap();
        assert_eq!(op, Operation::NoOp);
    }

    #[test]
    fn test_explicit_secret_rotation_is_update_never_replace() {
        let state = applied(ResourceSpec::Client(client("web")), Some("provider-generated"));
        let rotated = client("web").with_secret("caller-chosen");
        let op = planner()
            .plan(Some(&ResourceSpec::Client(rotated)), Some(&state))
            .unwrap();
        assert_eq!(
            op,
            Operation::UpdateInPlace {
                fields: vec!["secret".into()]
            }
        );
    }

    #[test]
    fn test_unknown_kind_surfaces_before_remote_work() {
        let empty = Planner::new(SchemaRegistry::empty());
        let spec = ResourceSpec::Client(client("web"));
        let err = empty.plan(Some(&spec), None).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_RESOURCE_TYPE");
    }
}
