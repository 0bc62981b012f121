//! # dexsync-engine
//!
//! The reconciliation engine: given a desired resource graph and the state
//! records of previous runs, compute the minimal set of remote operations
//! and drive them against the identity service's administrative API.
//!
//! ## Architecture
//!
//! - [`plan`] - per-resource diff producing [`plan::Operation`]s, with
//!   immutable-field changes escalated to replace
//! - [`executor`] - maps operations onto administrative API calls with
//!   conflict adoption, partial-update semantics and idempotent delete
//! - [`retry`] - exponential backoff for transient network failures
//! - [`state`] - reconciliation state records and the [`state::StateStore`]
//!   seam
//! - [`run`] - dependency-ordered, semaphore-bounded run orchestration with
//!   cancellation
//! - [`summary`] - per-resource outcomes and run aggregation
//!
//! ## Example
//!
//! ```ignore
//! use dexsync_engine::prelude::*;
//!
//! let api = Arc::new(dexsync_api::connect(&config).await?);
//! let store = Arc::new(MemoryStateStore::new());
//! let reconciler = Reconciler::new(api, store);
//!
//! let desired = DesiredState::new()
//!     .with(DesiredResource::new(connector_spec.clone()))
//!     .with(DesiredResource::new(client_spec).depends_on(connector_spec.id()));
//!
//! let summary = reconciler.reconcile(desired).await?;
//! assert!(summary.is_fully_converged());
//! ```

pub mod executor;
pub mod plan;
pub mod retry;
pub mod run;
pub mod state;
pub mod summary;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::executor::{AppliedAction, ExecutionResult, Executor};
    pub use crate::plan::{Operation, Planner};
    pub use crate::retry::RetryPolicy;
    pub use crate::run::{
        CancellationToken, DesiredResource, DesiredState, Reconciler, RunConfig,
    };
    pub use crate::state::{MemoryStateStore, ResourceState, StateStore};
    pub use crate::summary::{
        OutcomeCounts, OutcomeKind, ResourceOutcome, RunSummary, SkipReason,
    };
}
