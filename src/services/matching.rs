use crate::core::{ByLengthOfStay, GroupBy, Matcher, MatchingError, Ring};
use crate::models::ApplicationId;
use crate::services::store::{AcceptOutcome, RejectedCycle, RingStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the matching service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Matching(#[from] MatchingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary of one matching recompute
#[derive(Debug, Clone, Default)]
pub struct MatchingRun {
    pub pending_applications: usize,
    pub rings_created: usize,
    pub discarded: u64,
    pub rejected: Vec<RejectedCycle>,
}

/// Entry point used by the enclosing service layer
///
/// Holds no state between calls; everything lives in the store.
pub struct MatchingService<G = ByLengthOfStay> {
    store: Arc<dyn RingStore>,
    matcher: Matcher<G>,
}

impl<G: GroupBy> MatchingService<G> {
    pub fn new(store: Arc<dyn RingStore>, matcher: Matcher<G>) -> Self {
        Self { store, matcher }
    }

    /// Recompute the proposal set from the current pending pool
    ///
    /// Call after every change to the pool. Unaccepted rings from earlier
    /// runs are replaced in the same unit that creates the new ones.
    pub async fn run_matching(&self) -> Result<MatchingRun, ServiceError> {
        let snapshot = self.store.fetch_pending_applications().await?;
        let cycles = self.matcher.find_matching_application_sets(&snapshot)?;
        let outcome = self.store.replace_recommendations(&cycles).await?;

        tracing::info!(
            "Matching run: {} pending applications, {} cycles, {} rings created, {} discarded, {} rejected",
            snapshot.len(),
            cycles.len(),
            outcome.created.len(),
            outcome.discarded,
            outcome.rejected.len()
        );

        Ok(MatchingRun {
            pending_applications: snapshot.len(),
            rings_created: outcome.created.len(),
            discarded: outcome.discarded,
            rejected: outcome.rejected,
        })
    }

    /// Record one participant's acceptance
    pub async fn accept_participant(&self, participant: Uuid) -> Result<AcceptOutcome, ServiceError> {
        let outcome = self.store.accept_participant(participant).await?;

        if outcome.state.is_finalized() && !outcome.matched_applications.is_empty() {
            tracing::info!(
                "Recommendation {} finalized: matched {:?}, purged {} conflicting rings",
                outcome.recommendation_id,
                outcome.matched_applications,
                outcome.purged_recommendations.len()
            );
        } else {
            tracing::debug!(
                "Participant {} accepted recommendation {} ({:?})",
                participant,
                outcome.recommendation_id,
                outcome.state
            );
        }

        Ok(outcome)
    }

    pub async fn recommendation(&self, id: Uuid) -> Result<Ring, ServiceError> {
        Ok(self.store.recommendation(id).await?)
    }

    pub async fn recommendations_for_application(
        &self,
        application: ApplicationId,
    ) -> Result<Vec<Ring>, ServiceError> {
        Ok(self.store.recommendations_for_application(application).await?)
    }
}
