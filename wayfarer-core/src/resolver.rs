use std::collections::BTreeSet;

use tracing::debug;

use crate::model::{AirportId, LocationId};
use crate::repository::AirportRepository;
use crate::{SearchError, SearchResult};

/// Which end of the itinerary a parameter pair describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    From,
    To,
}

impl Side {
    pub fn airport_param(self) -> &'static str {
        match self {
            Side::From => "fromAirportId",
            Side::To => "toAirportId",
        }
    }

    pub fn location_param(self) -> &'static str {
        match self {
            Side::From => "fromLocationId",
            Side::To => "toLocationId",
        }
    }
}

/// A departure or arrival point as the caller named it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Airport(AirportId),
    Location(LocationId),
}

impl Endpoint {
    /// Exactly one of the two ids must be present.
    pub fn select(
        side: Side,
        airport_id: Option<AirportId>,
        location_id: Option<LocationId>,
    ) -> SearchResult<Self> {
        match (airport_id, location_id) {
            (Some(id), None) => Ok(Endpoint::Airport(id)),
            (None, Some(id)) => Ok(Endpoint::Location(id)),
            (Some(_), Some(_)) => Err(SearchError::InvalidQuery(format!(
                "{} and {} are mutually exclusive",
                side.airport_param(),
                side.location_param()
            ))),
            (None, None) => Err(SearchError::InvalidQuery(format!(
                "one of {} or {} is required",
                side.airport_param(),
                side.location_param()
            ))),
        }
    }
}

/// Expand an endpoint into concrete airport ids. Unknown airports and
/// locations without airports yield an empty set, not an error.
pub async fn resolve(
    airports: &dyn AirportRepository,
    endpoint: Endpoint,
) -> SearchResult<BTreeSet<AirportId>> {
    let ids: BTreeSet<AirportId> = match endpoint {
        Endpoint::Airport(id) => airports
            .get_airport(id)
            .await
            .map_err(|e| SearchError::Storage(e.to_string()))?
            .map(|airport| airport.id)
            .into_iter()
            .collect(),
        Endpoint::Location(id) => airports
            .list_airports_by_location(id)
            .await
            .map_err(|e| SearchError::Storage(e.to_string()))?
            .into_iter()
            .filter(|airport| airport.location_id == id)
            .map(|airport| airport.id)
            .collect(),
    };

    debug!("Resolved {:?} to {} airport(s)", endpoint, ids.len());
    Ok(ids)
}

pub async fn resolve_airport_ids(
    airports: &dyn AirportRepository,
    side: Side,
    airport_id: Option<AirportId>,
    location_id: Option<LocationId>,
) -> SearchResult<BTreeSet<AirportId>> {
    let endpoint = Endpoint::select(side, airport_id, location_id)?;
    resolve(airports, endpoint).await
}
