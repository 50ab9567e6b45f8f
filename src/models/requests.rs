use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query for listing the rings an application takes part in
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecommendationsQuery {
    #[validate(range(min = 1))]
    #[serde(alias = "application_id", rename = "applicationId")]
    pub application_id: i64,
}
