// Core algorithm exports
pub mod cycles;
pub mod graph;
pub mod grouping;
pub mod matcher;
pub mod ring;

use crate::models::{ApplicationId, PropertyId};
use thiserror::Error;

pub use cycles::{elementary_cycles, Cycle};
pub use graph::PreferenceGraph;
pub use grouping::{ByLengthOfStay, GroupBy};
pub use matcher::{MatchLimits, Matcher};
pub use ring::{Ring, RingError, Transition};

/// Errors from graph construction and cycle enumeration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchingError {
    #[error("Application {0} has no property")]
    MissingProperty(ApplicationId),

    #[error("Property {property:?} of application {application} has no city")]
    MissingCity {
        application: ApplicationId,
        property: PropertyId,
    },

    #[error("Compatibility group {key} has {size} applications, limit is {limit}")]
    GroupTooLarge {
        key: String,
        size: usize,
        limit: usize,
    },
}
