pub mod model;
pub mod window;
pub mod query;
pub mod resolver;
pub mod shaper;
pub mod repository;
pub mod search;

pub use model::{Airline, Airport, ClassType, ExtraFeature, Flight, Location, Price, Provider, Trip};
pub use query::{OneWayQuery, Page, PageRequest, RoundTripQuery, TripQuery};
pub use search::{SearchSettings, TripSearchParams, TripSearchService};
pub use shaper::TripSearchResult;
pub use window::DateWindow;

/// Failures of reference data itself (entity invariants, dangling ids).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Unknown {entity} reference: {id}")]
    UnknownReference { entity: &'static str, id: i64 },
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Failures of a single trip search, resolved at the orchestrator boundary.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Trip query timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Storage failure: {0}")]
    Storage(String),
}

pub type SearchResult<T> = Result<T, SearchError>;
