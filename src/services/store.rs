use crate::core::{Cycle, Ring, RingError};
use crate::models::{Application, ApplicationId, RingState};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while reading or writing rings
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Ring error: {0}")]
    Ring(#[from] RingError),
}

/// A cycle that could not be turned into a ring
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedCycle {
    pub cycle: Cycle,
    pub reason: String,
}

/// Result of replacing the proposal set
#[derive(Debug, Clone, Default)]
pub struct ReplaceOutcome {
    pub created: Vec<Ring>,
    /// Unaccepted recommendations deleted before creating the new ones
    pub discarded: u64,
    pub rejected: Vec<RejectedCycle>,
}

/// Result of one accept call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptOutcome {
    pub recommendation_id: Uuid,
    pub participant_id: Uuid,
    pub state: RingState,
    /// Applications matched by this call (empty unless it finalized the ring)
    pub matched_applications: Vec<ApplicationId>,
    /// Other recommendations deleted because they shared a matched application
    pub purged_recommendations: Vec<Uuid>,
}

impl AcceptOutcome {
    pub(crate) fn pending(ring: &Ring, participant: Uuid) -> Self {
        Self {
            recommendation_id: ring.id(),
            participant_id: participant,
            state: ring.state(),
            matched_applications: Vec::new(),
            purged_recommendations: Vec::new(),
        }
    }
}

/// Persistence for the pending pool and the recommendation rings
///
/// Every method is one atomic unit: it either applies completely or leaves
/// the stored state as it was.
#[async_trait]
pub trait RingStore: Send + Sync {
    /// Snapshot of all unmatched applications with property city and
    /// preferred cities loaded
    async fn fetch_pending_applications(&self) -> Result<Vec<Application>, StoreError>;

    /// Delete every unaccepted recommendation, then persist one ring per cycle
    ///
    /// Invalid or stale cycles are reported in `rejected` and do not abort
    /// the batch.
    async fn replace_recommendations(&self, cycles: &[Cycle]) -> Result<ReplaceOutcome, StoreError>;

    /// Accept on behalf of one participant, finalizing the ring and purging
    /// conflicting rings when it was the last one
    async fn accept_participant(&self, participant: Uuid) -> Result<AcceptOutcome, StoreError>;

    async fn recommendation(&self, id: Uuid) -> Result<Ring, StoreError>;

    async fn recommendations_for_application(
        &self,
        application: ApplicationId,
    ) -> Result<Vec<Ring>, StoreError>;
}

/// Turn a cycle into a fresh ring if every member is still pending
pub(crate) fn prepare_ring(
    cycle: &Cycle,
    pending: &HashSet<ApplicationId>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Ring, RejectedCycle> {
    let reject = |reason: String| RejectedCycle {
        cycle: cycle.clone(),
        reason,
    };

    let ring = Ring::from_cycle(cycle, now).map_err(|e| reject(e.to_string()))?;
    if let Some(stale) = cycle.iter().find(|id| !pending.contains(id)) {
        return Err(reject(format!("application {} is no longer pending", stale)));
    }
    Ok(ring)
}

/// Make sure none of the ring's applications got matched elsewhere
pub(crate) fn ensure_unmatched(
    ring: &Ring,
    unmatched: &HashSet<ApplicationId>,
) -> Result<(), StoreError> {
    match ring.application_ids().into_iter().find(|id| !unmatched.contains(id)) {
        Some(taken) => Err(StoreError::ConsistencyViolation(format!(
            "application {} of recommendation {} is already matched",
            taken,
            ring.id()
        ))),
        None => Ok(()),
    }
}
