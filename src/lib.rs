//! Swap Ring - circular housing-swap matching
//!
//! Finds closed exchange rings among pending rental applications: every
//! member moves into the property offered by the next one. Rings are
//! proposed in batches and finalized once every member accepts.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{elementary_cycles, MatchLimits, Matcher, PreferenceGraph, Ring};
pub use models::{Application, ApplicationId, LengthOfStay, RingState};
pub use services::{InMemoryRingStore, MatchingService, PgRingStore, RingStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let graph = PreferenceGraph::from_edges(
            [ApplicationId(1), ApplicationId(2)],
            [(ApplicationId(1), ApplicationId(2)), (ApplicationId(2), ApplicationId(1))],
        );
        assert_eq!(elementary_cycles(&graph, None).len(), 1);
    }
}
