use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{AirportId, Trip};
use crate::window::DateWindow;

/// Zero-based page index plus page size. Size is always positive once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// Cut one page out of an already ordered sequence.
    pub fn slice<I>(ordered: I, request: PageRequest) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = ordered
            .into_iter()
            .skip(skip)
            .take(request.limit as usize)
            .collect();

        Self { items, page: request.page, limit: request.limit }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneWayQuery {
    pub from_airport_ids: BTreeSet<AirportId>,
    pub to_airport_ids: BTreeSet<AirportId>,
    pub departure: DateWindow,
}

impl OneWayQuery {
    /// Outbound route and departure window, shared by both query shapes.
    pub fn matches_outbound(&self, trip: &Trip) -> bool {
        self.from_airport_ids.contains(&trip.outbound_departure_airport_id())
            && self.to_airport_ids.contains(&trip.outbound_arrival_airport_id())
            && self.departure.contains(trip.outbound_departure_time())
    }

    pub fn matches(&self, trip: &Trip) -> bool {
        trip.is_one_way() && self.matches_outbound(trip)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripQuery {
    pub outbound: OneWayQuery,
    pub return_window: DateWindow,
}

impl RoundTripQuery {
    pub fn matches(&self, trip: &Trip) -> bool {
        self.outbound.matches_outbound(trip)
            && trip
                .return_departure_time()
                .is_some_and(|departs| self.return_window.contains(departs))
    }
}

/// A validated, fully resolved search. Built once; the presence of a return
/// window selects the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripQuery {
    OneWay(OneWayQuery),
    RoundTrip(RoundTripQuery),
}

impl TripQuery {
    pub fn new(
        from_airport_ids: BTreeSet<AirportId>,
        to_airport_ids: BTreeSet<AirportId>,
        departure: DateWindow,
        return_window: Option<DateWindow>,
    ) -> Self {
        let outbound = OneWayQuery { from_airport_ids, to_airport_ids, departure };
        match return_window {
            Some(return_window) => TripQuery::RoundTrip(RoundTripQuery { outbound, return_window }),
            None => TripQuery::OneWay(outbound),
        }
    }

    pub fn outbound(&self) -> &OneWayQuery {
        match self {
            TripQuery::OneWay(query) => query,
            TripQuery::RoundTrip(query) => &query.outbound,
        }
    }

    /// True when one side resolved to no airports, so nothing can match.
    pub fn has_empty_route(&self) -> bool {
        let outbound = self.outbound();
        outbound.from_airport_ids.is_empty() || outbound.to_airport_ids.is_empty()
    }

    pub fn matches(&self, trip: &Trip) -> bool {
        match self {
            TripQuery::OneWay(query) => query.matches(trip),
            TripQuery::RoundTrip(query) => query.matches(trip),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TripQuery::OneWay(_) => "one-way",
            TripQuery::RoundTrip(_) => "round-trip",
        }
    }
}
