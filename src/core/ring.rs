use crate::models::{ApplicationId, Recommendation, RecommendationApplication, RingState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while building or advancing a ring
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingError {
    #[error("Invalid cycle: a ring needs at least 2 participants, got {0}")]
    InvalidCycle(usize),

    #[error("Invalid cycle: application {0} appears more than once")]
    DuplicateParticipant(ApplicationId),

    #[error("Participant {participant} is not part of recommendation {recommendation}")]
    UnknownParticipant { participant: Uuid, recommendation: Uuid },

    #[error("Broken ring {0}: links do not form a single circle")]
    BrokenLinks(Uuid),
}

/// What a single accept changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Participant was already accepted; nothing changed
    Unchanged,
    /// Participant accepted, ring still waits for others
    Accepted,
    /// Last participant accepted; these applications are now matched
    Finalized(Vec<ApplicationId>),
}

/// A recommendation together with its participants, in ring order
///
/// `members[i].recommended_next == members[(i + 1) % len].id` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ring {
    pub recommendation: Recommendation,
    pub members: Vec<RecommendationApplication>,
}

impl Ring {
    /// Create a fresh, fully unaccepted ring from a cycle
    pub fn from_cycle(cycle: &[ApplicationId], now: DateTime<Utc>) -> Result<Self, RingError> {
        if cycle.len() < 2 {
            return Err(RingError::InvalidCycle(cycle.len()));
        }
        let mut seen = HashSet::with_capacity(cycle.len());
        for &application in cycle {
            if !seen.insert(application) {
                return Err(RingError::DuplicateParticipant(application));
            }
        }

        let recommendation = Recommendation {
            id: Uuid::new_v4(),
            accepted: false,
            created_at: now,
            finalized_at: None,
        };
        let ids: Vec<Uuid> = cycle.iter().map(|_| Uuid::new_v4()).collect();

        let members = cycle
            .iter()
            .enumerate()
            .map(|(i, &application_id)| RecommendationApplication {
                id: ids[i],
                recommendation_id: recommendation.id,
                application_id,
                accepted: false,
                accepted_at: None,
                recommended_next: ids[(i + 1) % ids.len()],
            })
            .collect();

        Ok(Self { recommendation, members })
    }

    /// Reassemble a ring from stored rows in any order
    ///
    /// Members are reordered by following `recommended_next` from the first
    /// row; the links must close into one circle covering every row.
    pub fn from_parts(
        recommendation: Recommendation,
        mut rows: Vec<RecommendationApplication>,
    ) -> Result<Self, RingError> {
        let id = recommendation.id;
        if rows.len() < 2 {
            return Err(RingError::InvalidCycle(rows.len()));
        }
        if rows.iter().any(|r| r.recommendation_id != id) {
            return Err(RingError::BrokenLinks(id));
        }

        let mut members = Vec::with_capacity(rows.len());
        let mut current = rows.swap_remove(0);
        loop {
            let next = current.recommended_next;
            members.push(current);
            match rows.iter().position(|r| r.id == next) {
                Some(pos) => current = rows.swap_remove(pos),
                None => break,
            }
        }

        let closes = members.first().map(|m| m.id) == members.last().map(|m| m.recommended_next);
        if !rows.is_empty() || !closes {
            return Err(RingError::BrokenLinks(id));
        }
        Ok(Self { recommendation, members })
    }

    pub fn id(&self) -> Uuid {
        self.recommendation.id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn application_ids(&self) -> Vec<ApplicationId> {
        self.members.iter().map(|m| m.application_id).collect()
    }

    pub fn involves(&self, application: ApplicationId) -> bool {
        self.members.iter().any(|m| m.application_id == application)
    }

    pub fn member(&self, participant: Uuid) -> Option<&RecommendationApplication> {
        self.members.iter().find(|m| m.id == participant)
    }

    pub fn state(&self) -> RingState {
        if self.recommendation.accepted {
            return RingState::Finalized;
        }
        RingState::Pending {
            accepted: self.members.iter().filter(|m| m.accepted).count(),
            total: self.members.len(),
        }
    }

    /// Walk `recommended_next` links starting at `participant`, visiting each
    /// member once
    pub fn walk_from(&self, participant: Uuid) -> Vec<ApplicationId> {
        let Some(start) = self.members.iter().position(|m| m.id == participant) else {
            return Vec::new();
        };
        let mut visited = Vec::with_capacity(self.members.len());
        let mut current = &self.members[start];
        loop {
            visited.push(current.application_id);
            match self.member(current.recommended_next) {
                Some(next) if next.id != participant => current = next,
                _ => break,
            }
        }
        visited
    }

    /// Apply one participant's acceptance
    ///
    /// Finalizes the recommendation once every member has accepted. The
    /// caller is responsible for persisting the returned transition as one
    /// unit together with matching the applications and purging conflicts.
    pub fn accept(&mut self, participant: Uuid, now: DateTime<Utc>) -> Result<Transition, RingError> {
        let recommendation = self.recommendation.id;
        let member = self
            .members
            .iter_mut()
            .find(|m| m.id == participant)
            .ok_or(RingError::UnknownParticipant { participant, recommendation })?;

        if member.accepted {
            return Ok(Transition::Unchanged);
        }
        member.accepted = true;
        member.accepted_at = Some(now);

        if self.members.iter().any(|m| !m.accepted) {
            return Ok(Transition::Accepted);
        }

        self.recommendation.accepted = true;
        self.recommendation.finalized_at = Some(now);
        Ok(Transition::Finalized(self.application_ids()))
    }
}
