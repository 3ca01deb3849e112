use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{Flight, FlightId, Price, Trip};

/// A trip as returned by search, with its derived stop counts and cheapest price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSearchResult {
    #[serde(flatten)]
    pub trip: Trip,
    pub leave_stop_count: usize,
    pub return_stop_count: usize,
    pub min_price: Option<Price>,
}

/// No arrival leg means no stops; otherwise the arrival leg counts as one
/// stop on top of the interval flights.
pub fn stop_count(arrival: Option<&Flight>, intervals: &BTreeSet<FlightId>) -> usize {
    match arrival {
        Some(_) => 1 + intervals.len(),
        None => 0,
    }
}

/// Cheapest price; the lowest price id wins a tie.
pub fn min_price(prices: &[Price]) -> Option<&Price> {
    prices.iter().min_by_key(|price| (price.amount, price.id))
}

pub fn shape(trip: Trip) -> TripSearchResult {
    let leave_stop_count = stop_count(trip.leave_arrival_flight.as_ref(), &trip.departure_flight_intervals);
    let return_stop_count = stop_count(trip.return_arrival_flight.as_ref(), &trip.return_flight_intervals);
    let min_price = min_price(&trip.prices).cloned();

    TripSearchResult {
        trip,
        leave_stop_count,
        return_stop_count,
        min_price,
    }
}

impl From<Trip> for TripSearchResult {
    fn from(trip: Trip) -> Self {
        shape(trip)
    }
}
