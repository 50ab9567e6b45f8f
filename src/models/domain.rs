use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a pending rental application
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub i64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(pub i64);

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub i64);

/// Supported lengths of stay, in months
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum LengthOfStay {
    ThreeMonths,
    SixMonths,
    TwelveMonths,
    TwentyFourMonths,
}

impl LengthOfStay {
    pub fn months(self) -> i32 {
        match self {
            LengthOfStay::ThreeMonths => 3,
            LengthOfStay::SixMonths => 6,
            LengthOfStay::TwelveMonths => 12,
            LengthOfStay::TwentyFourMonths => 24,
        }
    }
}

impl TryFrom<i32> for LengthOfStay {
    type Error = String;

    fn try_from(months: i32) -> Result<Self, Self::Error> {
        match months {
            3 => Ok(LengthOfStay::ThreeMonths),
            6 => Ok(LengthOfStay::SixMonths),
            12 => Ok(LengthOfStay::TwelveMonths),
            24 => Ok(LengthOfStay::TwentyFourMonths),
            other => Err(format!("unsupported length of stay: {} months", other)),
        }
    }
}

impl From<LengthOfStay> for i32 {
    fn from(value: LengthOfStay) -> Self {
        value.months()
    }
}

impl fmt::Display for LengthOfStay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} months", self.months())
    }
}

/// The property an applicant offers in exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    #[serde(rename = "cityId", default)]
    pub city_id: Option<CityId>,
}

/// A pending application as read from the pool
///
/// `property` and `property.city_id` are optional because storage allows
/// them to be unset; the graph builder refuses such records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    #[serde(rename = "lengthOfStay")]
    pub length_of_stay: LengthOfStay,
    #[serde(default)]
    pub property: Option<Property>,
    /// Ranked by preference; rank is not used for matching
    #[serde(rename = "preferredCities", default)]
    pub preferred_cities: Vec<CityId>,
    #[serde(rename = "petFriendly", default)]
    pub pet_friendly: Option<bool>,
    #[serde(rename = "moveInDate", default)]
    pub move_in_date: Option<NaiveDate>,
    #[serde(default)]
    pub accepted: bool,
}

/// One proposed or finalized exchange ring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub accepted: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "finalizedAt", default)]
    pub finalized_at: Option<DateTime<Utc>>,
}

/// One participant node of a ring
///
/// `recommended_next` points at the participant whose property satisfies
/// this participant's preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationApplication {
    pub id: Uuid,
    #[serde(rename = "recommendationId")]
    pub recommendation_id: Uuid,
    #[serde(rename = "applicationId")]
    pub application_id: ApplicationId,
    pub accepted: bool,
    #[serde(rename = "acceptedAt", default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(rename = "recommendedNext")]
    pub recommended_next: Uuid,
}

/// Acceptance state of a whole ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RingState {
    Pending { accepted: usize, total: usize },
    Finalized,
}

impl RingState {
    pub fn is_finalized(&self) -> bool {
        matches!(self, RingState::Finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_of_stay_conversion() {
        assert_eq!(LengthOfStay::try_from(6), Ok(LengthOfStay::SixMonths));
        assert_eq!(i32::from(LengthOfStay::TwentyFourMonths), 24);
        assert!(LengthOfStay::try_from(5).is_err());
    }

    #[test]
    fn test_application_deserializes_camel_case() {
        let json = r#"{
            "id": 7,
            "lengthOfStay": 12,
            "property": { "id": 3, "cityId": 42 },
            "preferredCities": [1, 2]
        }"#;

        let app: Application = serde_json::from_str(json).unwrap();
        assert_eq!(app.id, ApplicationId(7));
        assert_eq!(app.length_of_stay, LengthOfStay::TwelveMonths);
        assert_eq!(app.property.and_then(|p| p.city_id), Some(CityId(42)));
        assert!(!app.accepted);
    }

    #[test]
    fn test_ring_state_serializes_with_status_tag() {
        let state = RingState::Pending { accepted: 1, total: 3 };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["total"], 3);
    }
}
