use async_trait::async_trait;
use std::error::Error;

use crate::model::{Airport, AirportId, Location, LocationId, Trip};
use crate::query::{OneWayQuery, Page, PageRequest, RoundTripQuery};

/// Read access to airports and the locations that own them
#[async_trait]
pub trait AirportRepository: Send + Sync {
    async fn get_airport(
        &self,
        id: AirportId,
    ) -> Result<Option<Airport>, Box<dyn Error + Send + Sync>>;

    async fn get_location(
        &self,
        id: LocationId,
    ) -> Result<Option<Location>, Box<dyn Error + Send + Sync>>;

    async fn list_airports_by_location(
        &self,
        location_id: LocationId,
    ) -> Result<Vec<Airport>, Box<dyn Error + Send + Sync>>;
}

/// Paged trip lookup. Implementations order by outbound departure time, then
/// trip id, so that paging through one search never repeats or skips a row.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn find_one_way(
        &self,
        query: &OneWayQuery,
        page: PageRequest,
    ) -> Result<Page<Trip>, Box<dyn Error + Send + Sync>>;

    async fn find_round_trip(
        &self,
        query: &RoundTripQuery,
        page: PageRequest,
    ) -> Result<Page<Trip>, Box<dyn Error + Send + Sync>>;
}
