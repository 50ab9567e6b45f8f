use crate::core::{Cycle, Ring, Transition};
use crate::models::{Application, ApplicationId};
use crate::services::store::{
    ensure_unmatched, prepare_ring, AcceptOutcome, ReplaceOutcome, RingStore, StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct StoreState {
    applications: BTreeMap<ApplicationId, Application>,
    rings: BTreeMap<Uuid, Ring>,
    /// participant id -> recommendation id
    owners: HashMap<Uuid, Uuid>,
}

impl StoreState {
    fn pending_ids(&self) -> HashSet<ApplicationId> {
        self.applications
            .values()
            .filter(|a| !a.accepted)
            .map(|a| a.id)
            .collect()
    }

    fn remove_ring(&mut self, id: Uuid) -> Option<Ring> {
        let ring = self.rings.remove(&id)?;
        for member in &ring.members {
            self.owners.remove(&member.id);
        }
        Some(ring)
    }

    fn delete_unaccepted_recommendations(&mut self) -> u64 {
        let stale: Vec<Uuid> = self
            .rings
            .values()
            .filter(|r| !r.recommendation.accepted)
            .map(|r| r.id())
            .collect();
        for id in &stale {
            self.remove_ring(*id);
        }
        stale.len() as u64
    }

    fn persist_recommendation(&mut self, ring: Ring) {
        for member in &ring.members {
            self.owners.insert(member.id, ring.id());
        }
        self.rings.insert(ring.id(), ring);
    }

    fn mark_applications_matched(&mut self, ids: &[ApplicationId]) {
        for id in ids {
            if let Some(application) = self.applications.get_mut(id) {
                application.accepted = true;
            }
        }
    }

    fn delete_recommendations_involving_applications(
        &mut self,
        ids: &[ApplicationId],
        except: Uuid,
    ) -> Vec<Uuid> {
        let conflicting: Vec<Uuid> = self
            .rings
            .values()
            .filter(|r| r.id() != except && ids.iter().any(|id| r.involves(*id)))
            .map(|r| r.id())
            .collect();
        for id in &conflicting {
            self.remove_ring(*id);
        }
        conflicting
    }
}

/// Ring store kept in process memory
///
/// One async mutex guards the whole state, so every trait method runs as a
/// single critical section. Used by tests, benches and local demos.
#[derive(Debug, Default)]
pub struct InMemoryRingStore {
    state: Mutex<StoreState>,
}

impl InMemoryRingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_applications<I>(applications: I) -> Self
    where
        I: IntoIterator<Item = Application>,
    {
        let state = StoreState {
            applications: applications.into_iter().map(|a| (a.id, a)).collect(),
            ..StoreState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Add or replace an application in the pool
    pub async fn insert_application(&self, application: Application) {
        let mut state = self.state.lock().await;
        state.applications.insert(application.id, application);
    }

    pub async fn application(&self, id: ApplicationId) -> Option<Application> {
        self.state.lock().await.applications.get(&id).cloned()
    }

    pub async fn rings(&self) -> Vec<Ring> {
        self.state.lock().await.rings.values().cloned().collect()
    }
}

#[async_trait]
impl RingStore for InMemoryRingStore {
    async fn fetch_pending_applications(&self) -> Result<Vec<Application>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .applications
            .values()
            .filter(|a| !a.accepted)
            .cloned()
            .collect())
    }

    async fn replace_recommendations(&self, cycles: &[Cycle]) -> Result<ReplaceOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let pending = state.pending_ids();

        let mut outcome = ReplaceOutcome {
            discarded: state.delete_unaccepted_recommendations(),
            ..ReplaceOutcome::default()
        };

        for cycle in cycles {
            match prepare_ring(cycle, &pending, now) {
                Ok(ring) => {
                    state.persist_recommendation(ring.clone());
                    outcome.created.push(ring);
                }
                Err(rejected) => {
                    tracing::warn!("Skipping cycle {:?}: {}", rejected.cycle, rejected.reason);
                    outcome.rejected.push(rejected);
                }
            }
        }

        Ok(outcome)
    }

    async fn accept_participant(&self, participant: Uuid) -> Result<AcceptOutcome, StoreError> {
        let mut state = self.state.lock().await;

        let recommendation_id = *state
            .owners
            .get(&participant)
            .ok_or_else(|| StoreError::NotFound(format!("participant {}", participant)))?;
        // Work on a copy so a failed check leaves the store untouched
        let mut ring = state
            .rings
            .get(&recommendation_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("recommendation {}", recommendation_id)))?;

        match ring.accept(participant, Utc::now())? {
            Transition::Unchanged => Ok(AcceptOutcome::pending(&ring, participant)),
            Transition::Accepted => {
                let outcome = AcceptOutcome::pending(&ring, participant);
                state.rings.insert(recommendation_id, ring);
                Ok(outcome)
            }
            Transition::Finalized(matched) => {
                ensure_unmatched(&ring, &state.pending_ids())?;

                let state_after = ring.state();
                state.rings.insert(recommendation_id, ring);
                state.mark_applications_matched(&matched);
                let purged =
                    state.delete_recommendations_involving_applications(&matched, recommendation_id);

                Ok(AcceptOutcome {
                    recommendation_id,
                    participant_id: participant,
                    state: state_after,
                    matched_applications: matched,
                    purged_recommendations: purged,
                })
            }
        }
    }

    async fn recommendation(&self, id: Uuid) -> Result<Ring, StoreError> {
        let state = self.state.lock().await;
        state
            .rings
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("recommendation {}", id)))
    }

    async fn recommendations_for_application(
        &self,
        application: ApplicationId,
    ) -> Result<Vec<Ring>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .rings
            .values()
            .filter(|r| r.involves(application))
            .cloned()
            .collect())
    }
}
