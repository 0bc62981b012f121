//! Reconciliation state records and the state store seam.
//!
//! A [`ResourceState`] is the per-resource record of the last applied spec
//! plus remote-assigned attributes, most importantly a provider-generated
//! client secret. State outlives any single run; persistence is owned by
//! the embedding host through the [`StateStore`] trait, with an in-memory
//! implementation for tests and single-process use.
//!
//! Serialized state redacts secret fields by default. Hosts that need the
//! plaintext (for example to hand a generated secret to another system)
//! must go through [`ResourceState::unmasked_json`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use dexsync_core::error::ProviderResult;
use dexsync_core::ids::ResourceId;
use dexsync_core::resource::ResourceSpec;
use dexsync_core::secret::SecretString;

/// Per-resource record of the last successful apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceState {
    /// Namespaced resource identifier.
    pub id: ResourceId,

    /// The spec as last applied, in normalized form.
    pub spec: ResourceSpec,

    /// Secret generated by the provider when the spec did not supply one.
    /// Absent for public clients, connectors, and caller-managed secrets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_secret: Option<SecretString>,

    /// When the resource was first created remotely by this provider.
    pub first_applied_at: DateTime<Utc>,

    /// When the resource was last reconciled successfully.
    pub last_applied_at: DateTime<Utc>,
}

impl ResourceState {
    /// Record a first successful apply.
    #[must_use]
    pub fn new(spec: ResourceSpec, generated_secret: Option<SecretString>) -> Self {
        let now = Utc::now();
        Self {
            id: spec.id(),
            spec,
            generated_secret,
            first_applied_at: now,
            last_applied_at: now,
        }
    }

    /// Record a successful re-apply, carrying creation time forward.
    #[must_use]
    pub fn reapplied(
        &self,
        spec: ResourceSpec,
        generated_secret: Option<SecretString>,
    ) -> Self {
        Self {
            id: spec.id(),
            spec,
            generated_secret,
            first_applied_at: self.first_applied_at,
            last_applied_at: Utc::now(),
        }
    }

    /// The secret currently in effect for a client resource: the
    /// caller-supplied one if present, otherwise the generated one.
    #[must_use]
    pub fn effective_client_secret(&self) -> Option<&SecretString> {
        match &self.spec {
            ResourceSpec::Client(client) => {
                client.secret.as_ref().or(self.generated_secret.as_ref())
            }
            ResourceSpec::Connector(_) => None,
        }
    }

    /// Export this record with plaintext secrets.
    ///
    /// This is the explicit unmasking path; plain serde serialization of a
    /// state record always redacts.
    pub fn unmasked_json(&self) -> ProviderResult<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(secret) = &self.generated_secret {
            value["generatedSecret"] = serde_json::Value::String(secret.expose().to_string());
        }
        if let ResourceSpec::Client(client) = &self.spec {
            if let Some(secret) = &client.secret {
                value["spec"]["secret"] =
                    serde_json::Value::String(secret.expose().to_string());
            }
        }
        Ok(value)
    }
}

/// Persistence seam for reconciliation state.
///
/// The store is owned by the embedding host; the engine only reads it at
/// the start of a run and writes back after each successful operation.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the state record for a resource, if any.
    async fn get(&self, id: &ResourceId) -> ProviderResult<Option<ResourceState>>;

    /// Insert or replace a state record.
    async fn upsert(&self, state: ResourceState) -> ProviderResult<()>;

    /// Remove a state record. Removing an absent record is a no-op.
    async fn remove(&self, id: &ResourceId) -> ProviderResult<()>;

    /// List all state records.
    async fn list(&self) -> ProviderResult<Vec<ResourceState>>;
}

/// Thread-safe in-memory [`StateStore`] for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: RwLock<HashMap<ResourceId, ResourceState>>,
}

impl MemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, id: &ResourceId) -> ProviderResult<Option<ResourceState>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn upsert(&self, state: ResourceState) -> ProviderResult<()> {
        self.records.write().await.insert(state.id.clone(), state);
        Ok(())
    }

    async fn remove(&self, id: &ResourceId) -> ProviderResult<()> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn list(&self) -> ProviderResult<Vec<ResourceState>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexsync_core::resource::ClientSpec;

    fn client_state(id: &str, secret: Option<&str>) -> ResourceState {
        let spec = ClientSpec::new(id, "Test")
            .with_redirect_uri("http://localhost:3000/callback")
            .normalized();
        ResourceState::new(
            ResourceSpec::Client(spec),
            secret.map(SecretString::new),
        )
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStateStore::new();
        let state = client_state("web", Some("gen"));
        let id = state.id.clone();

        store.upsert(state).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_some());
        assert_eq!(store.list().await.unwrap().len(), 1);

        store.remove(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());

        // Removing again is a no-op.
        store.remove(&id).await.unwrap();
    }

    #[test]
    fn test_serialization_redacts_generated_secret() {
        let state = client_state("web", Some("very-secret-value"));
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("very-secret-value"));
        assert!(json.contains("<redacted>"));
    }

    #[test]
    fn test_unmasked_json_exposes_secret() {
        let state = client_state("web", Some("very-secret-value"));
        let unmasked = state.unmasked_json().unwrap();
        assert_eq!(unmasked["generatedSecret"], "very-secret-value");
    }

    #[test]
    fn test_effective_secret_prefers_caller_value() {
        let spec = ClientSpec::new("web", "Test")
            .with_redirect_uri("http://localhost:3000/callback")
            .with_secret("explicit")
            .normalized();
        let state = ResourceState::new(
            ResourceSpec::Client(spec),
            Some(SecretString::new("generated")),
        );
        assert_eq!(
            state.effective_client_secret().map(SecretString::expose),
            Some("explicit")
        );
    }

    #[test]
    fn test_reapplied_keeps_first_applied_at() {
        let state = client_state("web", None);
        let reapplied = state.reapplied(state.spec.clone(), None);
        assert_eq!(reapplied.first_applied_at, state.first_applied_at);
        assert!(reapplied.last_applied_at >= state.last_applied_at);
    }
}
