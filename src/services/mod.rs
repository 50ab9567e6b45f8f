// Service exports
pub mod matching;
pub mod memory;
pub mod postgres;
pub mod store;

pub use matching::{MatchingRun, MatchingService, ServiceError};
pub use memory::InMemoryRingStore;
pub use postgres::PgRingStore;
pub use store::{AcceptOutcome, RejectedCycle, ReplaceOutcome, RingStore, StoreError};
