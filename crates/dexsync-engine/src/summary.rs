//! Per-resource outcomes and the run-level summary.
//!
//! Every reconciliation run yields one outcome per resource plus an
//! aggregate view for operator attention. Serialized summaries inherit the
//! secret redaction of the state records they embed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dexsync_core::ids::ResourceId;

use crate::executor::AppliedAction;
use crate::state::ResourceState;

/// Why a resource was skipped without any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    /// A declared dependency failed or was itself skipped.
    DependencyFailed { blocked_on: ResourceId },
    /// The run was cancelled before the resource was dispatched.
    Cancelled,
}

/// Outcome of reconciling one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum OutcomeKind {
    /// Created remotely; the resulting state includes remote-assigned
    /// attributes such as a generated secret (redacted in serialized form).
    Created { state: ResourceState },
    /// Changed fields were applied in place.
    Updated { state: ResourceState },
    /// Deleted and recreated.
    Replaced { state: ResourceState },
    /// Desired and stored state already agreed.
    Unchanged,
    /// Removed remotely after disappearing from desired state.
    Deleted,
    /// Reconciliation failed; `code` is the stable error code.
    Failed { code: String, message: String },
    /// Not attempted.
    Skipped { skip: SkipReason },
}

impl OutcomeKind {
    /// Build the outcome for a successful apply.
    #[must_use]
    pub fn applied(action: AppliedAction, state: ResourceState) -> Self {
        match action {
            AppliedAction::Created => OutcomeKind::Created { state },
            AppliedAction::Updated => OutcomeKind::Updated { state },
            AppliedAction::Replaced => OutcomeKind::Replaced { state },
        }
    }

    /// Whether the resource converged (applied, unchanged or deleted).
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(
            self,
            OutcomeKind::Failed { .. } | OutcomeKind::Skipped { .. }
        )
    }

    /// The resulting state, when the outcome carries one.
    #[must_use]
    pub fn state(&self) -> Option<&ResourceState> {
        match self {
            OutcomeKind::Created { state }
            | OutcomeKind::Updated { state }
            | OutcomeKind::Replaced { state } => Some(state),
            _ => None,
        }
    }
}

/// One resource's result within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceOutcome {
    /// Namespaced resource identifier.
    pub id: ResourceId,
    /// What happened.
    #[serde(flatten)]
    pub kind: OutcomeKind,
}

/// Aggregate counts over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Result of a full reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Run identifier for correlation with logs.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Every resource's outcome, in completion order.
    pub outcomes: Vec<ResourceOutcome>,
}

impl RunSummary {
    /// Aggregate outcome counts.
    #[must_use]
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for outcome in &self.outcomes {
            match &outcome.kind {
                OutcomeKind::Created { .. } => counts.created += 1,
                OutcomeKind::Updated { .. } => counts.updated += 1,
                OutcomeKind::Replaced { .. } => counts.replaced += 1,
                OutcomeKind::Unchanged => counts.unchanged += 1,
                OutcomeKind::Deleted => counts.deleted += 1,
                OutcomeKind::Failed { .. } => counts.failed += 1,
                OutcomeKind::Skipped { .. } => counts.skipped += 1,
            }
        }
        counts
    }

    /// Identifiers orphaned by a failed replace. These require operator
    /// intervention and are never retried automatically.
    #[must_use]
    pub fn partial_replace_failures(&self) -> Vec<&ResourceId> {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    &o.kind,
                    OutcomeKind::Failed { code, .. } if code == "PARTIAL_REPLACE_FAILURE"
                )
            })
            .map(|o| &o.id)
            .collect()
    }

    /// Find the outcome for a specific resource.
    #[must_use]
    pub fn outcome_for(&self, id: &ResourceId) -> Option<&OutcomeKind> {
        self.outcomes
            .iter()
            .find(|o| &o.id == id)
            .map(|o| &o.kind)
    }

    /// Whether every resource converged.
    #[must_use]
    pub fn is_fully_converged(&self) -> bool {
        self.outcomes.iter().all(|o| o.kind.is_success())
    }
}
