use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use tokio::sync::RwLock;

use wayfarer_core::model::{
    Airline, AirlineId, Airport, AirportId, ClassType, ClassTypeId, ExtraFeature, ExtraFeatureId, Flight,
    FlightId, Location, LocationId, Price, PriceId, Provider, ProviderId, Trip, TripId,
};
use wayfarer_core::query::{OneWayQuery, Page, PageRequest, RoundTripQuery, TripQuery};
use wayfarer_core::repository::{AirportRepository, TripRepository};
use wayfarer_core::{CoreError, CoreResult};

/// A trip as stored: every relationship is an id into the arena.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripRecord {
    pub id: TripId,
    pub leave_initial_flight_id: FlightId,
    pub leave_arrival_flight_id: Option<FlightId>,
    pub return_initial_flight_id: Option<FlightId>,
    pub return_arrival_flight_id: Option<FlightId>,
    pub departure_flight_intervals: BTreeSet<FlightId>,
    pub return_flight_intervals: BTreeSet<FlightId>,
    pub price_ids: Vec<PriceId>,
    pub class_type_ids: Vec<ClassTypeId>,
    pub extra_feature_ids: Vec<ExtraFeatureId>,
}

impl TripRecord {
    pub fn new(id: TripId, leave_initial_flight_id: FlightId) -> Self {
        Self { id, leave_initial_flight_id, ..Self::default() }
    }
}

#[derive(Debug, Clone)]
struct StoredPrice {
    id: PriceId,
    provider_id: ProviderId,
    amount: i64,
    currency: String,
}

#[derive(Debug, Default)]
struct Arena {
    locations: BTreeMap<LocationId, Location>,
    airports: BTreeMap<AirportId, Airport>,
    airlines: BTreeMap<AirlineId, Airline>,
    providers: BTreeMap<ProviderId, Provider>,
    flights: BTreeMap<FlightId, Flight>,
    prices: BTreeMap<PriceId, StoredPrice>,
    class_types: BTreeMap<ClassTypeId, ClassType>,
    extra_features: BTreeMap<ExtraFeatureId, ExtraFeature>,
    trips: BTreeMap<TripId, TripRecord>,
}

fn require<T>(map: &BTreeMap<i64, T>, entity: &'static str, id: i64) -> CoreResult<()> {
    if map.contains_key(&id) {
        Ok(())
    } else {
        Err(CoreError::UnknownReference { entity, id })
    }
}

impl Arena {
    fn price(&self, id: PriceId) -> Option<Price> {
        let stored = self.prices.get(&id)?;
        let provider = self.providers.get(&stored.provider_id)?.clone();
        Some(Price {
            id: stored.id,
            provider,
            amount: stored.amount,
            currency: stored.currency.clone(),
        })
    }

    fn flight(&self, id: Option<FlightId>) -> Option<Option<Flight>> {
        match id {
            Some(id) => self.flights.get(&id).cloned().map(Some),
            None => Some(None),
        }
    }

    /// Follow a record's ids. References are checked on insert, so a miss
    /// here only happens for records that were never admitted.
    /// Prices and tags come back in id order, as the Postgres store returns them.
    fn assemble(&self, record: &TripRecord) -> Option<Trip> {
        let mut prices: Vec<Price> = record.price_ids.iter().filter_map(|id| self.price(*id)).collect();
        prices.sort_by_key(|price| price.id);
        let mut class_types: Vec<ClassType> = record
            .class_type_ids
            .iter()
            .filter_map(|id| self.class_types.get(id).cloned())
            .collect();
        class_types.sort_by_key(|class_type| class_type.id);
        let mut extra_features: Vec<ExtraFeature> = record
            .extra_feature_ids
            .iter()
            .filter_map(|id| self.extra_features.get(id).cloned())
            .collect();
        extra_features.sort_by_key(|feature| feature.id);

        Some(Trip {
            id: record.id,
            leave_initial_flight: self.flights.get(&record.leave_initial_flight_id)?.clone(),
            leave_arrival_flight: self.flight(record.leave_arrival_flight_id)?,
            return_initial_flight: self.flight(record.return_initial_flight_id)?,
            return_arrival_flight: self.flight(record.return_arrival_flight_id)?,
            departure_flight_intervals: record.departure_flight_intervals.clone(),
            return_flight_intervals: record.return_flight_intervals.clone(),
            prices,
            class_types,
            extra_features,
        })
    }

    fn check_trip(&self, record: &TripRecord) -> CoreResult<()> {
        let legs = std::iter::once(record.leave_initial_flight_id)
            .chain(record.leave_arrival_flight_id)
            .chain(record.return_initial_flight_id)
            .chain(record.return_arrival_flight_id);
        for id in legs
            .chain(record.departure_flight_intervals.iter().copied())
            .chain(record.return_flight_intervals.iter().copied())
        {
            require(&self.flights, "flight", id)?;
        }
        for id in &record.price_ids {
            require(&self.prices, "price", *id)?;
        }
        for id in &record.class_type_ids {
            require(&self.class_types, "class type", *id)?;
        }
        for id in &record.extra_feature_ids {
            require(&self.extra_features, "extra feature", *id)?;
        }
        Ok(())
    }
}

/// Arena-backed store implementing the same lookups as the Postgres
/// repositories. Every insert validates the entity and its references.
#[derive(Debug, Default)]
pub struct MemoryStore {
    arena: RwLock<Arena>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_location(&self, location: Location) -> CoreResult<()> {
        location.validate()?;
        self.arena.write().await.locations.insert(location.id, location);
        Ok(())
    }

    pub async fn insert_airport(&self, airport: Airport) -> CoreResult<()> {
        airport.validate()?;
        let mut arena = self.arena.write().await;
        require(&arena.locations, "location", airport.location_id)?;
        arena.airports.insert(airport.id, airport);
        Ok(())
    }

    pub async fn insert_airline(&self, airline: Airline) -> CoreResult<()> {
        airline.validate()?;
        self.arena.write().await.airlines.insert(airline.id, airline);
        Ok(())
    }

    pub async fn insert_provider(&self, provider: Provider) -> CoreResult<()> {
        provider.validate()?;
        self.arena.write().await.providers.insert(provider.id, provider);
        Ok(())
    }

    pub async fn insert_flight(&self, flight: Flight) -> CoreResult<()> {
        flight.validate()?;
        let mut arena = self.arena.write().await;
        require(&arena.airports, "airport", flight.departure_airport_id)?;
        require(&arena.airports, "airport", flight.arrival_airport_id)?;
        require(&arena.airlines, "airline", flight.airline_id)?;
        arena.flights.insert(flight.id, flight);
        Ok(())
    }

    /// Stores the price against its provider id; the provider must already exist.
    pub async fn insert_price(&self, price: Price) -> CoreResult<()> {
        price.validate()?;
        let mut arena = self.arena.write().await;
        require(&arena.providers, "provider", price.provider.id)?;
        arena.prices.insert(
            price.id,
            StoredPrice {
                id: price.id,
                provider_id: price.provider.id,
                amount: price.amount,
                currency: price.currency,
            },
        );
        Ok(())
    }

    pub async fn insert_class_type(&self, class_type: ClassType) -> CoreResult<()> {
        class_type.validate()?;
        self.arena.write().await.class_types.insert(class_type.id, class_type);
        Ok(())
    }

    pub async fn insert_extra_feature(&self, feature: ExtraFeature) -> CoreResult<()> {
        feature.validate()?;
        self.arena.write().await.extra_features.insert(feature.id, feature);
        Ok(())
    }

    pub async fn insert_trip(&self, record: TripRecord) -> CoreResult<()> {
        let mut arena = self.arena.write().await;
        arena.check_trip(&record)?;
        arena.trips.insert(record.id, record);
        Ok(())
    }

    pub async fn get_trip(&self, id: TripId) -> Option<Trip> {
        let arena = self.arena.read().await;
        arena.trips.get(&id).and_then(|record| arena.assemble(record))
    }

    async fn find(&self, query: &TripQuery, page: PageRequest) -> Page<Trip> {
        let arena = self.arena.read().await;
        let mut matching: Vec<Trip> = arena
            .trips
            .values()
            .filter_map(|record| arena.assemble(record))
            .filter(|trip| query.matches(trip))
            .collect();
        matching.sort_by_key(|trip| (trip.outbound_departure_time(), trip.id));

        Page::slice(matching, page)
    }
}

#[async_trait]
impl AirportRepository for MemoryStore {
    async fn get_airport(
        &self,
        id: AirportId,
    ) -> Result<Option<Airport>, Box<dyn Error + Send + Sync>> {
        Ok(self.arena.read().await.airports.get(&id).cloned())
    }

    async fn get_location(
        &self,
        id: LocationId,
    ) -> Result<Option<Location>, Box<dyn Error + Send + Sync>> {
        Ok(self.arena.read().await.locations.get(&id).cloned())
    }

    async fn list_airports_by_location(
        &self,
        location_id: LocationId,
    ) -> Result<Vec<Airport>, Box<dyn Error + Send + Sync>> {
        let arena = self.arena.read().await;
        Ok(arena
            .airports
            .values()
            .filter(|airport| airport.location_id == location_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TripRepository for MemoryStore {
    async fn find_one_way(
        &self,
        query: &OneWayQuery,
        page: PageRequest,
    ) -> Result<Page<Trip>, Box<dyn Error + Send + Sync>> {
        Ok(self.find(&TripQuery::OneWay(query.clone()), page).await)
    }

    async fn find_round_trip(
        &self,
        query: &RoundTripQuery,
        page: PageRequest,
    ) -> Result<Page<Trip>, Box<dyn Error + Send + Sync>> {
        Ok(self.find(&TripQuery::RoundTrip(query.clone()), page).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use wayfarer_core::window::build_window;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, name) in [(1, "Madrid"), (2, "Paris"), (3, "Lisbon")] {
            store
                .insert_location(Location { id, country: "EU".to_string(), name: name.to_string(), image: None })
                .await
                .unwrap();
        }
        for (id, code, location_id) in [(1, "MAD", 1), (2, "CDG", 2), (3, "TOJ", 1), (4, "ORY", 2)] {
            store
                .insert_airport(Airport { id, code: code.to_string(), name: code.to_string(), location_id })
                .await
                .unwrap();
        }
        store.insert_airline(Airline { id: 1, name: "Iberia".to_string() }).await.unwrap();
        store.insert_provider(Provider { id: 1, name: "Kiwi".to_string() }).await.unwrap();
        store
    }

    async fn add_one_way(store: &MemoryStore, id: i64, from: AirportId, to: AirportId, hour: u32) {
        let departs = Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap();
        store
            .insert_flight(Flight {
                id,
                name: format!("IB{}", id),
                departure_airport_id: from,
                arrival_airport_id: to,
                airline_id: 1,
                departure_time: departs,
                arrival_time: departs + Duration::hours(2),
            })
            .await
            .unwrap();
        store.insert_trip(TripRecord::new(id, id)).await.unwrap();
    }

    fn one_way(from: &[AirportId], to: &[AirportId]) -> OneWayQuery {
        OneWayQuery {
            from_airport_ids: from.iter().copied().collect(),
            to_airport_ids: to.iter().copied().collect(),
            departure: build_window(1_717_236_000, 2).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_dangling_references_rejected() {
        let store = seeded().await;

        let orphan = Airport { id: 9, code: "XXX".to_string(), name: "Nowhere".to_string(), location_id: 99 };
        assert!(matches!(
            store.insert_airport(orphan).await,
            Err(CoreError::UnknownReference { entity: "location", id: 99 })
        ));

        let err = store.insert_trip(TripRecord::new(1, 404)).await.unwrap_err();
        assert!(matches!(err, CoreError::UnknownReference { entity: "flight", id: 404 }));

        let blank = ClassType { id: 1, description: " ".to_string() };
        assert!(matches!(store.insert_class_type(blank).await, Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_location_lookup() {
        let store = seeded().await;
        let ids: Vec<i64> = store
            .list_airports_by_location(1)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(store.list_airports_by_location(3).await.unwrap().is_empty());
        assert!(store.get_location(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trip_assembled_with_prices_and_tags() {
        let store = seeded().await;
        add_one_way(&store, 1, 1, 2, 9).await;
        store
            .insert_price(Price {
                id: 5,
                provider: Provider { id: 1, name: String::new() },
                amount: 500,
                currency: "EUR".to_string(),
            })
            .await
            .unwrap();
        store.insert_extra_feature(ExtraFeature { id: 1, description: "Wi-Fi".to_string() }).await.unwrap();

        let record = TripRecord { price_ids: vec![5], extra_feature_ids: vec![1], ..TripRecord::new(2, 1) };
        store.insert_trip(record).await.unwrap();

        let trip = store.get_trip(2).await.unwrap();
        assert_eq!(trip.prices.len(), 1);
        assert_eq!(trip.prices[0].provider.name, "Kiwi");
        assert_eq!(trip.extra_features[0].description, "Wi-Fi");
    }

    #[tokio::test]
    async fn test_prices_come_back_in_id_order() {
        let store = seeded().await;
        add_one_way(&store, 1, 1, 2, 9).await;
        for id in [8, 5] {
            store
                .insert_price(Price {
                    id,
                    provider: Provider { id: 1, name: String::new() },
                    amount: 500,
                    currency: "EUR".to_string(),
                })
                .await
                .unwrap();
        }

        let record = TripRecord { price_ids: vec![8, 5], ..TripRecord::new(2, 1) };
        store.insert_trip(record).await.unwrap();

        let trip = store.get_trip(2).await.unwrap();
        let ids: Vec<i64> = trip.prices.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 8]);
        assert_eq!(wayfarer_core::shaper::min_price(&trip.prices).map(|p| p.id), Some(5));
    }

    #[tokio::test]
    async fn test_one_way_excludes_round_trips_and_other_routes() {
        let store = seeded().await;
        add_one_way(&store, 1, 1, 2, 9).await;
        add_one_way(&store, 2, 2, 1, 9).await;
        add_one_way(&store, 3, 1, 4, 9).await;

        let departs = Utc.with_ymd_and_hms(2024, 6, 8, 9, 0, 0).unwrap();
        store
            .insert_flight(Flight {
                id: 20,
                name: "IB20".to_string(),
                departure_airport_id: 2,
                arrival_airport_id: 1,
                airline_id: 1,
                departure_time: departs,
                arrival_time: departs + Duration::hours(2),
            })
            .await
            .unwrap();
        let round = TripRecord { return_initial_flight_id: Some(20), ..TripRecord::new(4, 1) };
        store.insert_trip(round).await.unwrap();

        let page = PageRequest { page: 0, limit: 10 };
        let found = store.find_one_way(&one_way(&[1], &[2]), page).await.unwrap();
        let ids: Vec<i64> = found.items.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1]);

        let round_query = RoundTripQuery {
            outbound: one_way(&[1], &[2, 4]),
            return_window: build_window(1_717_840_800, 2).unwrap(),
        };
        let found = store.find_round_trip(&round_query, page).await.unwrap();
        let ids: Vec<i64> = found.items.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![4]);
    }

    #[tokio::test]
    async fn test_pages_concatenate_to_the_full_result() {
        let store = seeded().await;
        // Several share a departure hour so the id tie-break matters.
        for (id, hour) in [(1, 12), (2, 8), (3, 12), (4, 6), (5, 8), (6, 23), (7, 0)] {
            let from = if id % 2 == 0 { 1 } else { 3 };
            add_one_way(&store, id, from, 2, hour).await;
        }
        let query = one_way(&[1, 3], &[2, 4]);

        let everything = store
            .find_one_way(&query, PageRequest { page: 0, limit: 100 })
            .await
            .unwrap()
            .items;
        let all_ids: Vec<i64> = everything.iter().map(|t| t.id).collect();
        assert_eq!(all_ids, vec![7, 4, 2, 5, 1, 3, 6]);

        for limit in 1..=4 {
            let mut paged = Vec::new();
            for page in 0.. {
                let items = store.find_one_way(&query, PageRequest { page, limit }).await.unwrap().items;
                if items.is_empty() {
                    break;
                }
                paged.extend(items.into_iter().map(|t| t.id));
            }
            assert_eq!(paged, all_ids, "limit {}", limit);
        }
    }
}
