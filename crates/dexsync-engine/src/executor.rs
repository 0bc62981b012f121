//! CRUD operation executor.
//!
//! Translates a planned [`Operation`] into administrative API calls,
//! handling the conflict and partial-failure semantics:
//!
//! - `Create` hitting an idempotency conflict re-fetches remote state and
//!   converts to a single in-place update; a persisting conflict surfaces
//!   as [`ProviderError::Conflict`].
//! - `UpdateInPlace` sends only the changed fields, never clobbering
//!   remote configuration it was not asked to touch.
//! - `Replace` is delete-then-create; when the create half fails the
//!   resource is left absent and the error names the orphaned identifier.
//! - `Delete` is idempotent: an already-absent target is success.
//!
//! Transient failures of individual calls are retried per [`RetryPolicy`].

use std::sync::Arc;
use tracing::{info, instrument, warn};

use dexsync_api::client::{AdminApi, ClientUpdate, ConnectorUpdate, RemoteClient, RemoteConnector};
use dexsync_core::error::{ProviderError, ProviderResult};
use dexsync_core::ids::ResourceId;
use dexsync_core::resource::{ClientSpec, ConnectorSpec, ResourceSpec};
use dexsync_core::schema::SchemaRegistry;
use dexsync_core::secret::{self, SecretString};

use crate::plan::{Operation, Planner};
use crate::retry::RetryPolicy;
use crate::state::ResourceState;

/// What a successful apply did remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedAction {
    /// The resource was created.
    Created,
    /// Changed fields were applied in place.
    Updated,
    /// The resource was deleted and recreated.
    Replaced,
}

/// Result of executing one operation.
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    /// Nothing to do; the stored state is carried forward unchanged.
    Unchanged(Option<ResourceState>),
    /// The resource was converged; record the new state.
    Applied {
        action: AppliedAction,
        state: ResourceState,
    },
    /// The resource was removed remotely. `existed` is false when the
    /// remote had already forgotten it.
    Deleted { existed: bool },
}

/// Executes planned operations against the administrative API.
pub struct Executor<A> {
    api: Arc<A>,
    retry: RetryPolicy,
    planner: Planner,
}

impl<A> std::fmt::Debug for Executor<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<A: AdminApi> Executor<A> {
    /// Create an executor with the default retry policy.
    pub fn new(api: Arc<A>, registry: SchemaRegistry) -> Self {
        Self {
            api,
            retry: RetryPolicy::default(),
            planner: Planner::new(registry),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate, plan and execute in one step.
    ///
    /// This is the per-resource pipeline the run orchestrator drives:
    /// validation failures surface before any remote call, unknown resource
    /// kinds surface from planning, and everything else flows through
    /// [`Executor::execute`].
    pub async fn apply(
        &self,
        id: &ResourceId,
        desired: Option<&ResourceSpec>,
        current: Option<&ResourceState>,
    ) -> ProviderResult<ExecutionResult> {
        if let Some(spec) = desired {
            spec.validate()?;
        }
        let operation = self.planner.plan(desired, current)?;
        self.execute(id, desired, current, &operation).await
    }

    /// Execute one planned operation for the identified resource.
    #[instrument(skip(self, desired, current, operation), fields(resource = %id, op = %operation))]
    pub async fn execute(
        &self,
        id: &ResourceId,
        desired: Option<&ResourceSpec>,
        current: Option<&ResourceState>,
        operation: &Operation,
    ) -> ProviderResult<ExecutionResult> {
        match operation {
            Operation::NoOp => Ok(ExecutionResult::Unchanged(current.cloned())),
            Operation::Create => {
                let desired = required_desired(desired)?;
                let state = self.create(desired, current).await?;
                info!(resource = %id, "Created resource");
                Ok(ExecutionResult::Applied {
                    action: AppliedAction::Created,
                    state,
                })
            }
            Operation::UpdateInPlace { fields } => {
                let desired = required_desired(desired)?;
                let current = current.ok_or_else(|| {
                    ProviderError::validation(format!("update of {id} without stored state"))
                })?;
                let state = self.update(desired, current, fields).await?;
                info!(resource = %id, fields = ?fields, "Updated resource in place");
                Ok(ExecutionResult::Applied {
                    action: AppliedAction::Updated,
                    state,
                })
            }
            Operation::Replace { fields } => {
                let desired = required_desired(desired)?;
                let state = self.replace(id, desired, current).await?;
                info!(resource = %id, fields = ?fields, "Replaced resource");
                Ok(ExecutionResult::Applied {
                    action: AppliedAction::Replaced,
                    state,
                })
            }
            Operation::Delete => {
                let existed = self.delete(id).await?;
                info!(resource = %id, existed = existed, "Deleted resource");
                Ok(ExecutionResult::Deleted { existed })
            }
        }
    }

    /// Create a resource, adopting remote state on an idempotency conflict.
    async fn create(
        &self,
        desired: &ResourceSpec,
        previous: Option<&ResourceState>,
    ) -> ProviderResult<ResourceState> {
        match desired.normalized() {
            ResourceSpec::Client(spec) => self.create_client(spec, previous).await,
            ResourceSpec::Connector(spec) => self.create_connector(spec, previous).await,
        }
    }

    async fn create_client(
        &self,
        spec: ClientSpec,
        previous: Option<&ResourceState>,
    ) -> ProviderResult<ResourceState> {
        // Materialize a secret for confidential clients the caller did not
        // provision one for.
        let generated = if spec.public || spec.secret.is_some() {
            None
        } else {
            Some(secret::generate())
        };
        let effective = spec.secret.as_ref().or(generated.as_ref());
        let remote = client_to_remote(&spec, effective);

        let creation = self
            .retry
            .run("CreateClient", || self.api.create_client(remote.clone()))
            .await?;

        if creation.already_exists {
            warn!(client = %spec.client_id, "Create conflict; adopting remote client");
            return self.adopt_client(spec, previous).await;
        }

        Ok(make_state(previous, ResourceSpec::Client(spec), generated))
    }

    /// Conflict recovery for clients: re-fetch the remote registration and
    /// converge onto it with one in-place update.
    async fn adopt_client(
        &self,
        spec: ClientSpec,
        previous: Option<&ResourceState>,
    ) -> ProviderResult<ResourceState> {
        let id = spec.client_id.to_string();
        let remote = self
            .retry
            .run("GetClient", || self.api.get_client(&id))
            .await?
            .ok_or_else(|| ProviderError::Conflict { id: id.clone() })?;

        let (remote_spec, remote_secret) = remote_client_to_spec(&remote);
        let remote_state = ResourceState::new(ResourceSpec::Client(remote_spec), remote_secret);

        let desired = ResourceSpec::Client(spec.clone());
        match self.planner.plan(Some(&desired), Some(&remote_state))? {
            Operation::NoOp => {}
            Operation::UpdateInPlace { fields } => {
                let update = client_update(&spec, &fields);
                let found = self
                    .retry
                    .run("UpdateClient", || self.api.update_client(update.clone()))
                    .await?;
                if !found {
                    // The registration vanished between the conflict and the
                    // converging update.
                    return Err(ProviderError::Conflict { id });
                }
            }
            // The remote registration differs in an immutable field; it was
            // not created by this provider and cannot be adopted.
            _ => return Err(ProviderError::Conflict { id }),
        }

        let generated = if spec.secret.is_some() {
            None
        } else {
            remote_state.generated_secret
        };
        Ok(make_state(previous, desired, generated))
    }

    async fn create_connector(
        &self,
        spec: ConnectorSpec,
        previous: Option<&ResourceState>,
    ) -> ProviderResult<ResourceState> {
        let remote = connector_to_remote(&spec)?;
        let already_exists = self
            .retry
            .run("CreateConnector", || {
                self.api.create_connector(remote.clone())
            })
            .await?;

        if already_exists {
            warn!(connector = %spec.connector_id, "Create conflict; adopting remote connector");
            return self.adopt_connector(spec, previous).await;
        }

        Ok(make_state(previous, ResourceSpec::Connector(spec), None))
    }

    /// Conflict recovery for connectors.
    async fn adopt_connector(
        &self,
        spec: ConnectorSpec,
        previous: Option<&ResourceState>,
    ) -> ProviderResult<ResourceState> {
        let id = spec.connector_id.to_string();
        let remote = self
            .retry
            .run("GetConnector", || self.api.get_connector(&id))
            .await?
            .ok_or_else(|| ProviderError::Conflict { id: id.clone() })?;

        if remote.connector_type != spec.wire_type() {
            // Connector type is immutable; a mismatch cannot be adopted.
            return Err(ProviderError::Conflict { id });
        }

        let mut update = ConnectorUpdate {
            id: id.clone(),
            ..ConnectorUpdate::default()
        };
        if remote.name != spec.name {
            update.new_name = Some(spec.name.clone());
        }
        let wire_config = spec.wire_config()?;
        if remote.config != wire_config {
            update.new_config = Some(wire_config);
        }

        if update.new_name.is_some() || update.new_config.is_some() {
            let found = self
                .retry
                .run("UpdateConnector", || {
                    self.api.update_connector(update.clone())
                })
                .await?;
            if !found {
                return Err(ProviderError::Conflict { id });
            }
        }

        Ok(make_state(previous, ResourceSpec::Connector(spec), None))
    }

    /// Apply only the changed fields in place.
    async fn update(
        &self,
        desired: &ResourceSpec,
        current: &ResourceState,
        fields: &[String],
    ) -> ProviderResult<ResourceState> {
        match desired.normalized() {
            ResourceSpec::Client(spec) => {
                let update = client_update(&spec, fields);
                let found = self
                    .retry
                    .run("UpdateClient", || self.api.update_client(update.clone()))
                    .await?;
                if !found {
                    return Err(ProviderError::TargetMissing {
                        id: spec.client_id.to_string(),
                    });
                }
                let generated = if spec.secret.is_some() {
                    None
                } else {
                    current.generated_secret.clone()
                };
                Ok(current.reapplied(ResourceSpec::Client(spec), generated))
            }
            ResourceSpec::Connector(spec) => {
                let mut update = ConnectorUpdate {
                    id: spec.connector_id.to_string(),
                    ..ConnectorUpdate::default()
                };
                for field in fields {
                    match field.as_str() {
                        "name" => update.new_name = Some(spec.name.clone()),
                        "config" => update.new_config = Some(spec.wire_config()?),
                        _ => {}
                    }
                }
                let found = self
                    .retry
                    .run("UpdateConnector", || {
                        self.api.update_connector(update.clone())
                    })
                    .await?;
                if !found {
                    return Err(ProviderError::TargetMissing {
                        id: spec.connector_id.to_string(),
                    });
                }
                Ok(current.reapplied(ResourceSpec::Connector(spec), None))
            }
        }
    }

    /// Delete then recreate. A failed create leaves the resource absent and
    /// is reported as a partial replace failure, never retried blindly.
    async fn replace(
        &self,
        id: &ResourceId,
        desired: &ResourceSpec,
        current: Option<&ResourceState>,
    ) -> ProviderResult<ResourceState> {
        self.delete(id).await?;

        match self.create(desired, current).await {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(resource = %id, error = %e, "Create failed after delete; resource orphaned");
                Err(ProviderError::PartialReplace {
                    id: id.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Delete a resource. Returns whether the remote still had it; an
    /// already-absent target is success.
    async fn delete(&self, id: &ResourceId) -> ProviderResult<bool> {
        match id {
            ResourceId::Client(client_id) => {
                let raw = client_id.to_string();
                self.retry
                    .run("DeleteClient", || self.api.delete_client(&raw))
                    .await
            }
            ResourceId::Connector(connector_id) => {
                let raw = connector_id.to_string();
                self.retry
                    .run("DeleteConnector", || self.api.delete_connector(&raw))
                    .await
            }
        }
    }
}

fn required_desired(desired: Option<&ResourceSpec>) -> ProviderResult<&ResourceSpec> {
    desired.ok_or_else(|| ProviderError::validation("operation requires a desired spec"))
}

fn make_state(
    previous: Option<&ResourceState>,
    spec: ResourceSpec,
    generated: Option<SecretString>,
) -> ResourceState {
    match previous {
        Some(previous) => previous.reapplied(spec, generated),
        None => ResourceState::new(spec, generated),
    }
}

fn client_to_remote(spec: &ClientSpec, secret: Option<&SecretString>) -> RemoteClient {
    RemoteClient {
        id: spec.client_id.to_string(),
        secret: secret.map(|s| s.expose().to_string()).unwrap_or_default(),
        redirect_uris: spec.redirect_uris.clone(),
        trusted_peers: spec.trusted_peers.clone(),
        public: spec.public,
        name: spec.name.clone(),
        logo_url: spec.logo_url.clone().unwrap_or_default(),
    }
}

fn remote_client_to_spec(remote: &RemoteClient) -> (ClientSpec, Option<SecretString>) {
    let spec = ClientSpec {
        client_id: remote.id.as_str().into(),
        name: remote.name.clone(),
        redirect_uris: remote.redirect_uris.clone(),
        trusted_peers: remote.trusted_peers.clone(),
        public: remote.public,
        logo_url: (!remote.logo_url.is_empty()).then(|| remote.logo_url.clone()),
        secret: None,
    };
    let secret = (!remote.secret.is_empty()).then(|| SecretString::new(remote.secret.clone()));
    (spec.normalized(), secret)
}

fn connector_to_remote(spec: &ConnectorSpec) -> ProviderResult<RemoteConnector> {
    Ok(RemoteConnector {
        id: spec.connector_id.to_string(),
        connector_type: spec.wire_type().to_string(),
        name: spec.name.clone(),
        config: spec.wire_config()?,
    })
}

/// Map changed client fields onto a partial update.
///
/// Unchanged fields stay `None` and are left untouched remotely. Clearing
/// `logoUrl` is not expressible in the partial-update contract; the remote
/// keeps its last value.
fn client_update(spec: &ClientSpec, fields: &[String]) -> ClientUpdate {
    let mut update = ClientUpdate {
        id: spec.client_id.to_string(),
        ..ClientUpdate::default()
    };
    for field in fields {
        match field.as_str() {
            "redirectUris" => update.redirect_uris = Some(spec.redirect_uris.clone()),
            "trustedPeers" => update.trusted_peers = Some(spec.trusted_peers.clone()),
            "name" => update.name = Some(spec.name.clone()),
            "logoUrl" => update.logo_url = spec.logo_url.clone(),
            "secret" => {
                update.secret = spec.secret.as_ref().map(|s| s.expose().to_string());
            }
            _ => {}
        }
    }
    update
}
