//! Reconciliation run orchestration.
//!
//! A run takes the caller's desired resource graph, diffs every resource
//! against stored state, and drives the executor with bounded parallelism:
//!
//! - Independent resources reconcile concurrently on a semaphore-bounded
//!   worker pool.
//! - A resource with declared dependencies waits until every dependency
//!   converged; a failed or skipped dependency skips its dependents, while
//!   unrelated resources proceed (failure isolation per identifier).
//! - Each identifier appears at most once per run, so there is never more
//!   than one in-flight operation per resource.
//! - The run-level cancellation token stops queued work immediately and
//!   aborts in-flight operations at their next await point; remote effects
//!   that already happened are not rolled back.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use dexsync_api::client::AdminApi;
use dexsync_core::error::{ProviderError, ProviderResult};
use dexsync_core::ids::ResourceId;
use dexsync_core::resource::ResourceSpec;
use dexsync_core::schema::SchemaRegistry;

use crate::executor::{ExecutionResult, Executor};
use crate::retry::RetryPolicy;
use crate::state::{ResourceState, StateStore};
use crate::summary::{OutcomeKind, ResourceOutcome, RunSummary, SkipReason};

/// Worker pool configuration for a run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of resources reconciled concurrently.
    pub concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// One declared resource plus its ordering edges.
#[derive(Debug, Clone)]
pub struct DesiredResource {
    /// The resource specification.
    pub spec: ResourceSpec,
    /// Resources that must converge before this one is attempted.
    pub depends_on: Vec<ResourceId>,
}

impl DesiredResource {
    /// Declare a resource with no dependencies.
    pub fn new(spec: impl Into<ResourceSpec>) -> Self {
        Self {
            spec: spec.into(),
            depends_on: Vec::new(),
        }
    }

    /// Add an ordering edge.
    #[must_use]
    pub fn depends_on(mut self, id: ResourceId) -> Self {
        self.depends_on.push(id);
        self
    }
}

impl From<ResourceSpec> for DesiredResource {
    fn from(spec: ResourceSpec) -> Self {
        Self::new(spec)
    }
}

impl From<dexsync_core::resource::ClientSpec> for DesiredResource {
    fn from(spec: dexsync_core::resource::ClientSpec) -> Self {
        Self::new(ResourceSpec::Client(spec))
    }
}

impl From<dexsync_core::resource::ConnectorSpec> for DesiredResource {
    fn from(spec: dexsync_core::resource::ConnectorSpec) -> Self {
        Self::new(ResourceSpec::Connector(spec))
    }
}

/// The full desired resource graph for one run.
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    /// Declared resources.
    pub resources: Vec<DesiredResource>,
}

impl DesiredState {
    /// Create an empty desired state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource.
    #[must_use]
    pub fn with(mut self, resource: impl Into<DesiredResource>) -> Self {
        self.resources.push(resource.into());
        self
    }

    /// Add a resource in place.
    pub fn push(&mut self, resource: impl Into<DesiredResource>) {
        self.resources.push(resource.into());
    }
}

/// Run-level cancellation token.
///
/// Cancellation prevents new work and aborts in-flight operations at their
/// next await point; already-committed remote side effects stay.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { inner: Arc::new(tx) }
    }

    /// Request cancellation of the run.
    pub fn cancel(&self) {
        self.inner.send_replace(true);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.subscribe()
    }
}

enum TaskResult {
    Done(ExecutionResult),
    Failed(ProviderError),
    Cancelled,
}

struct WorkItem {
    desired: Option<ResourceSpec>,
    depends_on: Vec<ResourceId>,
    current: Option<ResourceState>,
    /// Dependency that does not exist in this run's graph, if any.
    invalid_dep: Option<ResourceId>,
}

/// Orchestrates reconciliation runs.
pub struct Reconciler<A, S> {
    api: Arc<A>,
    registry: SchemaRegistry,
    retry: RetryPolicy,
    store: Arc<S>,
    config: RunConfig,
    cancel: CancellationToken,
}

impl<A, S> std::fmt::Debug for Reconciler<A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<A, S> Reconciler<A, S>
where
    A: AdminApi + 'static,
    S: StateStore + 'static,
{
    /// Create a reconciler with the built-in schema registry and defaults.
    pub fn new(api: Arc<A>, store: Arc<S>) -> Self {
        Self::with_registry(api, store, SchemaRegistry::new())
    }

    /// Create a reconciler over a custom schema registry.
    pub fn with_registry(api: Arc<A>, store: Arc<S>, registry: SchemaRegistry) -> Self {
        Self {
            api,
            registry,
            retry: RetryPolicy::default(),
            store,
            config: RunConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Override the run configuration.
    #[must_use]
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the executor's retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Token that cancels this reconciler's runs.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Reconcile the desired graph against stored and remote state.
    ///
    /// Always yields a per-resource outcome for every declared resource and
    /// every stale state record; only a malformed graph (duplicate
    /// identifiers) fails the run as a whole.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn reconcile(&self, desired: DesiredState) -> ProviderResult<RunSummary> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let started_at = Utc::now();

        let mut pending = self.build_items(desired).await?;
        let dependents = build_dependents(&pending);
        let mut unmet: HashMap<ResourceId, HashSet<ResourceId>> = pending
            .iter()
            .map(|(id, item)| {
                (
                    id.clone(),
                    item.depends_on.iter().cloned().collect::<HashSet<_>>(),
                )
            })
            .collect();

        let total = pending.len();
        info!(resources = total, concurrency = self.config.concurrency, "Starting reconciliation run");

        let mut ready: VecDeque<ResourceId> = unmet
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| id.clone())
            .collect();

        let executor = Arc::new(
            Executor::new(Arc::clone(&self.api), self.registry.clone())
                .with_retry(self.retry.clone()),
        );
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let (tx, mut rx) = mpsc::unbounded_channel::<(ResourceId, TaskResult)>();

        let mut outcomes: Vec<ResourceOutcome> = Vec::with_capacity(total);
        let mut in_flight = 0usize;

        while outcomes.len() < total {
            if !self.cancel.is_cancelled() {
                while let Some(id) = ready.pop_front() {
                    let Some(item) = pending.remove(&id) else {
                        continue;
                    };
                    if let Some(missing) = item.invalid_dep {
                        let outcome = OutcomeKind::Failed {
                            code: "VALIDATION_ERROR".into(),
                            message: format!("depends on unknown resource {missing}"),
                        };
                        self.finish(&id, outcome, &mut outcomes, &dependents, &mut pending, &mut unmet, &mut ready);
                        continue;
                    }
                    self.dispatch(id, item, &executor, &semaphore, &tx);
                    in_flight += 1;
                }
            }

            if in_flight == 0 {
                if pending.is_empty() {
                    break;
                }
                // Nothing running and nothing dispatchable: either the run
                // was cancelled or the remaining items form a cycle.
                let remaining: Vec<ResourceId> = pending.keys().cloned().collect();
                for id in remaining {
                    pending.remove(&id);
                    let kind = if self.cancel.is_cancelled() {
                        OutcomeKind::Skipped {
                            skip: SkipReason::Cancelled,
                        }
                    } else {
                        OutcomeKind::Failed {
                            code: "VALIDATION_ERROR".into(),
                            message: "dependency cycle prevents reconciliation".into(),
                        }
                    };
                    outcomes.push(ResourceOutcome { id, kind });
                }
                continue;
            }

            let Some((id, result)) = rx.recv().await else {
                break;
            };
            in_flight -= 1;

            let kind = match result {
                TaskResult::Done(result) => self.record(&id, result).await,
                TaskResult::Failed(e) => {
                    warn!(resource = %id, error = %e, code = e.error_code(), "Resource reconciliation failed");
                    OutcomeKind::Failed {
                        code: e.error_code().into(),
                        message: e.to_string(),
                    }
                }
                TaskResult::Cancelled => OutcomeKind::Skipped {
                    skip: SkipReason::Cancelled,
                },
            };
            self.finish(&id, kind, &mut outcomes, &dependents, &mut pending, &mut unmet, &mut ready);
        }

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        let counts = summary.counts();
        info!(
            created = counts.created,
            updated = counts.updated,
            replaced = counts.replaced,
            unchanged = counts.unchanged,
            deleted = counts.deleted,
            failed = counts.failed,
            skipped = counts.skipped,
            "Reconciliation run finished"
        );
        Ok(summary)
    }

    /// Index desired resources and stale state into work items.
    async fn build_items(
        &self,
        desired: DesiredState,
    ) -> ProviderResult<HashMap<ResourceId, WorkItem>> {
        let mut declared: HashSet<ResourceId> = HashSet::new();
        for resource in &desired.resources {
            if !declared.insert(resource.spec.id()) {
                return Err(ProviderError::validation(format!(
                    "resource {} declared more than once",
                    resource.spec.id()
                )));
            }
        }

        let mut items: HashMap<ResourceId, WorkItem> = HashMap::new();
        for resource in desired.resources {
            let id = resource.spec.id();
            let current = self.store.get(&id).await?;
            let mut depends_on: Vec<ResourceId> = resource
                .depends_on
                .into_iter()
                .filter(|dep| dep != &id)
                .collect();
            depends_on.sort();
            depends_on.dedup();
            items.insert(
                id,
                WorkItem {
                    desired: Some(resource.spec),
                    depends_on,
                    current,
                    invalid_dep: None,
                },
            );
        }

        // Anything recorded in state but no longer declared gets deleted.
        for state in self.store.list().await? {
            if !items.contains_key(&state.id) {
                items.insert(
                    state.id.clone(),
                    WorkItem {
                        desired: None,
                        depends_on: Vec::new(),
                        current: Some(state),
                        invalid_dep: None,
                    },
                );
            }
        }

        // Dependencies must name another item in this run's graph.
        let ids: HashSet<ResourceId> = items.keys().cloned().collect();
        for item in items.values_mut() {
            if let Some(missing) = item.depends_on.iter().find(|dep| !ids.contains(dep)) {
                item.invalid_dep = Some(missing.clone());
                item.depends_on.clear();
            }
        }

        Ok(items)
    }

    fn dispatch(
        &self,
        id: ResourceId,
        item: WorkItem,
        executor: &Arc<Executor<A>>,
        semaphore: &Arc<Semaphore>,
        tx: &mpsc::UnboundedSender<(ResourceId, TaskResult)>,
    ) {
        let executor = Arc::clone(executor);
        let semaphore = Arc::clone(semaphore);
        let tx = tx.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let _ = tx.send((id, TaskResult::Cancelled));
                    return;
                }
            };
            if cancel.is_cancelled() {
                let _ = tx.send((id, TaskResult::Cancelled));
                return;
            }

            let mut cancel_rx = cancel.subscribe();
            let result = tokio::select! {
                _ = cancel_rx.changed() => TaskResult::Cancelled,
                result = executor.apply(&id, item.desired.as_ref(), item.current.as_ref()) => {
                    match result {
                        Ok(execution) => TaskResult::Done(execution),
                        Err(e) => TaskResult::Failed(e),
                    }
                }
            };
            let _ = tx.send((id, result));
        });
    }

    /// Persist the result of a successful execution and build its outcome.
    async fn record(&self, id: &ResourceId, result: ExecutionResult) -> OutcomeKind {
        match result {
            ExecutionResult::Unchanged(_) => OutcomeKind::Unchanged,
            ExecutionResult::Applied { action, state } => {
                if let Err(e) = self.store.upsert(state.clone()).await {
                    warn!(resource = %id, error = %e, "Failed to persist state after apply");
                    return OutcomeKind::Failed {
                        code: e.error_code().into(),
                        message: e.to_string(),
                    };
                }
                OutcomeKind::applied(action, state)
            }
            ExecutionResult::Deleted { .. } => {
                if let Err(e) = self.store.remove(id).await {
                    warn!(resource = %id, error = %e, "Failed to remove state after delete");
                    return OutcomeKind::Failed {
                        code: e.error_code().into(),
                        message: e.to_string(),
                    };
                }
                OutcomeKind::Deleted
            }
        }
    }

    /// Record an outcome and release or skip dependents.
    fn finish(
        &self,
        id: &ResourceId,
        kind: OutcomeKind,
        outcomes: &mut Vec<ResourceOutcome>,
        dependents: &HashMap<ResourceId, Vec<ResourceId>>,
        pending: &mut HashMap<ResourceId, WorkItem>,
        unmet: &mut HashMap<ResourceId, HashSet<ResourceId>>,
        ready: &mut VecDeque<ResourceId>,
    ) {
        let succeeded = kind.is_success();
        outcomes.push(ResourceOutcome {
            id: id.clone(),
            kind,
        });

        if succeeded {
            for dependent in dependents.get(id).into_iter().flatten() {
                if let Some(deps) = unmet.get_mut(dependent) {
                    deps.remove(id);
                    if deps.is_empty() && pending.contains_key(dependent) {
                        ready.push_back(dependent.clone());
                    }
                }
            }
            return;
        }

        // A failed or skipped resource blocks everything that declared a
        // dependency on it, transitively.
        let mut blocked: VecDeque<ResourceId> = VecDeque::new();
        blocked.push_back(id.clone());
        while let Some(cause) = blocked.pop_front() {
            for dependent in dependents.get(&cause).into_iter().flatten() {
                if pending.remove(dependent).is_some() {
                    outcomes.push(ResourceOutcome {
                        id: dependent.clone(),
                        kind: OutcomeKind::Skipped {
                            skip: SkipReason::DependencyFailed {
                                blocked_on: cause.clone(),
                            },
                        },
                    });
                    blocked.push_back(dependent.clone());
                }
            }
        }
    }
}

fn build_dependents(
    items: &HashMap<ResourceId, WorkItem>,
) -> HashMap<ResourceId, Vec<ResourceId>> {
    let mut dependents: HashMap<ResourceId, Vec<ResourceId>> = HashMap::new();
    for (id, item) in items {
        for dep in &item.depends_on {
            dependents.entry(dep.clone()).or_default().push(id.clone());
        }
    }
    dependents
}
