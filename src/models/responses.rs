use crate::core::Ring;
use crate::models::domain::{ApplicationId, RingState};
use crate::services::{AcceptOutcome, MatchingRun, RejectedCycle};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response for the matching run endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RunMatchingResponse {
    #[serde(rename = "pendingApplications")]
    pub pending_applications: usize,
    #[serde(rename = "ringsCreated")]
    pub rings_created: usize,
    pub discarded: u64,
    pub rejected: Vec<RejectedCycle>,
}

impl From<MatchingRun> for RunMatchingResponse {
    fn from(run: MatchingRun) -> Self {
        Self {
            pending_applications: run.pending_applications,
            rings_created: run.rings_created,
            discarded: run.discarded,
            rejected: run.rejected,
        }
    }
}

/// Response for the accept endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AcceptResponse {
    #[serde(rename = "recommendationId")]
    pub recommendation_id: Uuid,
    #[serde(rename = "participantId")]
    pub participant_id: Uuid,
    pub state: RingState,
    #[serde(rename = "matchedApplications")]
    pub matched_applications: Vec<ApplicationId>,
    #[serde(rename = "purgedRecommendations")]
    pub purged_recommendations: Vec<Uuid>,
}

impl From<AcceptOutcome> for AcceptResponse {
    fn from(outcome: AcceptOutcome) -> Self {
        Self {
            recommendation_id: outcome.recommendation_id,
            participant_id: outcome.participant_id,
            state: outcome.state,
            matched_applications: outcome.matched_applications,
            purged_recommendations: outcome.purged_recommendations,
        }
    }
}

/// Rings involving one application
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationListResponse {
    #[serde(rename = "applicationId")]
    pub application_id: ApplicationId,
    pub recommendations: Vec<Ring>,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}
