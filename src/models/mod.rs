// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Application, ApplicationId, CityId, LengthOfStay, Property, PropertyId, Recommendation,
    RecommendationApplication, RingState,
};
pub use requests::RecommendationsQuery;
pub use responses::{
    AcceptResponse, ErrorResponse, HealthResponse, RecommendationListResponse, RunMatchingResponse,
};
