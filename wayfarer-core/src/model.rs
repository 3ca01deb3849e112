use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

pub type LocationId = i64;
pub type AirportId = i64;
pub type AirlineId = i64;
pub type FlightId = i64;
pub type ProviderId = i64;
pub type PriceId = i64;
pub type ClassTypeId = i64;
pub type ExtraFeatureId = i64;
pub type TripId = i64;

fn require_non_blank(entity: &str, field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::ValidationError(format!("{} {} must not be blank", entity, field)));
    }
    Ok(())
}

// ============================================================================
// Reference data
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub country: String,
    pub name: String,
    pub image: Option<String>,
}

impl Location {
    pub fn validate(&self) -> CoreResult<()> {
        require_non_blank("location", "country", &self.country)?;
        require_non_blank("location", "name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
    pub id: AirportId,
    pub code: String,
    pub name: String,
    pub location_id: LocationId,
}

impl Airport {
    pub fn validate(&self) -> CoreResult<()> {
        require_non_blank("airport", "code", &self.code)?;
        require_non_blank("airport", "name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airline {
    pub id: AirlineId,
    pub name: String,
}

impl Airline {
    pub fn validate(&self) -> CoreResult<()> {
        require_non_blank("airline", "name", &self.name)
    }
}

/// One scheduled segment. Airports and airline are referenced by id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: FlightId,
    pub name: String,
    pub departure_airport_id: AirportId,
    pub arrival_airport_id: AirportId,
    pub airline_id: AirlineId,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

impl Flight {
    pub fn validate(&self) -> CoreResult<()> {
        require_non_blank("flight", "name", &self.name)?;

        if self.departure_time >= self.arrival_time {
            return Err(CoreError::ValidationError(format!(
                "flight {} must depart before it arrives",
                self.id
            )));
        }

        if self.departure_airport_id == self.arrival_airport_id {
            return Err(CoreError::ValidationError(format!(
                "flight {} departs from and arrives at airport {}",
                self.id, self.departure_airport_id
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
}

impl Provider {
    pub fn validate(&self) -> CoreResult<()> {
        require_non_blank("provider", "name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub id: PriceId,
    pub provider: Provider,
    pub amount: i64,
    pub currency: String,
}

impl Price {
    pub fn validate(&self) -> CoreResult<()> {
        if self.amount < 0 {
            return Err(CoreError::ValidationError(format!(
                "price {} has negative amount {}",
                self.id, self.amount
            )));
        }
        require_non_blank("price", "currency", &self.currency)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassType {
    pub id: ClassTypeId,
    pub description: String,
}

impl ClassType {
    pub fn validate(&self) -> CoreResult<()> {
        require_non_blank("class type", "description", &self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraFeature {
    pub id: ExtraFeatureId,
    pub description: String,
}

impl ExtraFeature {
    pub fn validate(&self) -> CoreResult<()> {
        require_non_blank("extra feature", "description", &self.description)
    }
}

// ============================================================================
// Trip aggregate
// ============================================================================

/// A bookable itinerary. The return legs are both absent for one-way trips.
/// Interval flights are only ever counted, so they are kept as ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub leave_initial_flight: Flight,
    pub leave_arrival_flight: Option<Flight>,
    pub return_initial_flight: Option<Flight>,
    pub return_arrival_flight: Option<Flight>,
    pub departure_flight_intervals: BTreeSet<FlightId>,
    pub return_flight_intervals: BTreeSet<FlightId>,
    pub prices: Vec<Price>,
    pub class_types: Vec<ClassType>,
    pub extra_features: Vec<ExtraFeature>,
}

impl Trip {
    pub fn is_one_way(&self) -> bool {
        self.return_initial_flight.is_none() && self.return_arrival_flight.is_none()
    }

    pub fn outbound_departure_airport_id(&self) -> AirportId {
        self.leave_initial_flight.departure_airport_id
    }

    /// Where the outbound itinerary ends: the arrival leg if there is one.
    pub fn outbound_arrival_airport_id(&self) -> AirportId {
        self.leave_arrival_flight
            .as_ref()
            .unwrap_or(&self.leave_initial_flight)
            .arrival_airport_id
    }

    pub fn outbound_departure_time(&self) -> DateTime<Utc> {
        self.leave_initial_flight.departure_time
    }

    pub fn return_departure_time(&self) -> Option<DateTime<Utc>> {
        self.return_initial_flight
            .as_ref()
            .or(self.return_arrival_flight.as_ref())
            .map(|flight| flight.departure_time)
    }
}
