use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use tracing::debug;

use wayfarer_core::model::{ClassType, ExtraFeature, Flight, FlightId, Price, Provider, Trip, TripId};
use wayfarer_core::query::{OneWayQuery, Page, PageRequest, RoundTripQuery};
use wayfarer_core::repository::TripRepository;

/// Outbound leg starts in $1, ends (at its arrival leg if any) in $2 and
/// departs inside [$3, $4).
const ONE_WAY_SQL: &str = r#"
    SELECT t.id, t.leave_initial_flight_id, t.leave_arrival_flight_id,
           t.return_initial_flight_id, t.return_arrival_flight_id
    FROM trips t
    JOIN flights li ON li.id = t.leave_initial_flight_id
    LEFT JOIN flights la ON la.id = t.leave_arrival_flight_id
    WHERE li.departure_airport_id = ANY($1)
      AND COALESCE(la.arrival_airport_id, li.arrival_airport_id) = ANY($2)
      AND li.departure_time >= $3 AND li.departure_time < $4
      AND t.return_initial_flight_id IS NULL
      AND t.return_arrival_flight_id IS NULL
    ORDER BY li.departure_time, t.id
    LIMIT $5 OFFSET $6
"#;

/// As above, plus a return leg departing inside [$5, $6).
const ROUND_TRIP_SQL: &str = r#"
    SELECT t.id, t.leave_initial_flight_id, t.leave_arrival_flight_id,
           t.return_initial_flight_id, t.return_arrival_flight_id
    FROM trips t
    JOIN flights li ON li.id = t.leave_initial_flight_id
    LEFT JOIN flights la ON la.id = t.leave_arrival_flight_id
    JOIN flights ri ON ri.id = COALESCE(t.return_initial_flight_id, t.return_arrival_flight_id)
    WHERE li.departure_airport_id = ANY($1)
      AND COALESCE(la.arrival_airport_id, li.arrival_airport_id) = ANY($2)
      AND li.departure_time >= $3 AND li.departure_time < $4
      AND ri.departure_time >= $5 AND ri.departure_time < $6
    ORDER BY li.departure_time, t.id
    LIMIT $7 OFFSET $8
"#;

pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TripRow {
    id: i64,
    leave_initial_flight_id: i64,
    leave_arrival_flight_id: Option<i64>,
    return_initial_flight_id: Option<i64>,
    return_arrival_flight_id: Option<i64>,
}

impl TripRow {
    fn leg_ids(&self) -> impl Iterator<Item = FlightId> {
        std::iter::once(self.leave_initial_flight_id)
            .chain(self.leave_arrival_flight_id)
            .chain(self.return_initial_flight_id)
            .chain(self.return_arrival_flight_id)
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: i64,
    name: String,
    departure_airport_id: i64,
    arrival_airport_id: i64,
    airline_id: i64,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            id: row.id,
            name: row.name,
            departure_airport_id: row.departure_airport_id,
            arrival_airport_id: row.arrival_airport_id,
            airline_id: row.airline_id,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
        }
    }
}

#[derive(sqlx::FromRow)]
struct IntervalRow {
    trip_id: i64,
    flight_id: i64,
}

#[derive(sqlx::FromRow)]
struct PriceRow {
    trip_id: i64,
    id: i64,
    amount: i64,
    currency: String,
    provider_id: i64,
    provider_name: String,
}

/// Class types and extra features share a shape.
#[derive(sqlx::FromRow)]
struct DescribedRow {
    trip_id: i64,
    id: i64,
    description: String,
}

fn group<T>(pairs: impl IntoIterator<Item = (TripId, T)>) -> HashMap<TripId, Vec<T>> {
    let mut grouped: HashMap<TripId, Vec<T>> = HashMap::new();
    for (trip_id, value) in pairs {
        grouped.entry(trip_id).or_default().push(value);
    }
    grouped
}

fn leg(
    flights: &HashMap<FlightId, Flight>,
    trip_id: TripId,
    flight_id: FlightId,
) -> Result<Flight, Box<dyn Error + Send + Sync>> {
    flights
        .get(&flight_id)
        .cloned()
        .ok_or_else(|| format!("trip {} references missing flight {}", trip_id, flight_id).into())
}

impl PgTripRepository {
    async fn intervals(
        &self,
        table: &str,
        trip_ids: &[TripId],
    ) -> Result<HashMap<TripId, BTreeSet<FlightId>>, Box<dyn Error + Send + Sync>> {
        let sql = format!("SELECT trip_id, flight_id FROM {} WHERE trip_id = ANY($1)", table);
        let rows = sqlx::query_as::<_, IntervalRow>(&sql)
            .bind(trip_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut intervals: HashMap<TripId, BTreeSet<FlightId>> = HashMap::new();
        for row in rows {
            intervals.entry(row.trip_id).or_default().insert(row.flight_id);
        }
        Ok(intervals)
    }

    async fn described(
        &self,
        join_table: &str,
        join_column: &str,
        table: &str,
        trip_ids: &[TripId],
    ) -> Result<Vec<DescribedRow>, Box<dyn Error + Send + Sync>> {
        let sql = format!(
            "SELECT j.trip_id, d.id, d.description FROM {join_table} j \
             JOIN {table} d ON d.id = j.{join_column} \
             WHERE j.trip_id = ANY($1) ORDER BY j.trip_id, d.id"
        );
        let rows = sqlx::query_as::<_, DescribedRow>(&sql)
            .bind(trip_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Load legs, intervals, prices and tags for a page of trip rows with one
    /// query per relation, then reassemble in page order.
    async fn hydrate(&self, rows: Vec<TripRow>) -> Result<Vec<Trip>, Box<dyn Error + Send + Sync>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let trip_ids: Vec<TripId> = rows.iter().map(|row| row.id).collect();
        let leg_ids: Vec<FlightId> = rows.iter().flat_map(TripRow::leg_ids).collect();

        let flights: HashMap<FlightId, Flight> = sqlx::query_as::<_, FlightRow>(
            r#"
            SELECT id, name, departure_airport_id, arrival_airport_id, airline_id,
                   departure_time, arrival_time
            FROM flights
            WHERE id = ANY($1)
            "#,
        )
        .bind(&leg_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| (row.id, Flight::from(row)))
        .collect();

        let mut departure_intervals = self.intervals("trip_departure_intervals", &trip_ids).await?;
        let mut return_intervals = self.intervals("trip_return_intervals", &trip_ids).await?;

        let price_rows = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT tp.trip_id, p.id, p.amount, p.currency,
                   pr.id AS provider_id, pr.name AS provider_name
            FROM trip_prices tp
            JOIN prices p ON p.id = tp.price_id
            JOIN providers pr ON pr.id = p.provider_id
            WHERE tp.trip_id = ANY($1)
            ORDER BY tp.trip_id, p.id
            "#,
        )
        .bind(&trip_ids)
        .fetch_all(&self.pool)
        .await?;
        let mut prices = group(price_rows.into_iter().map(|row| {
            let price = Price {
                id: row.id,
                provider: Provider { id: row.provider_id, name: row.provider_name },
                amount: row.amount,
                currency: row.currency,
            };
            (row.trip_id, price)
        }));

        let class_rows = self
            .described("trip_class_types", "class_type_id", "class_types", &trip_ids)
            .await?;
        let mut class_types = group(class_rows.into_iter().map(|row| {
            (row.trip_id, ClassType { id: row.id, description: row.description })
        }));

        let feature_rows = self
            .described("trip_extra_features", "extra_feature_id", "extra_features", &trip_ids)
            .await?;
        let mut extra_features = group(feature_rows.into_iter().map(|row| {
            (row.trip_id, ExtraFeature { id: row.id, description: row.description })
        }));

        rows.into_iter()
            .map(|row| -> Result<Trip, Box<dyn Error + Send + Sync>> {
                Ok(Trip {
                    id: row.id,
                    leave_initial_flight: leg(&flights, row.id, row.leave_initial_flight_id)?,
                    leave_arrival_flight: row
                        .leave_arrival_flight_id
                        .map(|id| leg(&flights, row.id, id))
                        .transpose()?,
                    return_initial_flight: row
                        .return_initial_flight_id
                        .map(|id| leg(&flights, row.id, id))
                        .transpose()?,
                    return_arrival_flight: row
                        .return_arrival_flight_id
                        .map(|id| leg(&flights, row.id, id))
                        .transpose()?,
                    departure_flight_intervals: departure_intervals.remove(&row.id).unwrap_or_default(),
                    return_flight_intervals: return_intervals.remove(&row.id).unwrap_or_default(),
                    prices: prices.remove(&row.id).unwrap_or_default(),
                    class_types: class_types.remove(&row.id).unwrap_or_default(),
                    extra_features: extra_features.remove(&row.id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn find_one_way(
        &self,
        query: &OneWayQuery,
        page: PageRequest,
    ) -> Result<Page<Trip>, Box<dyn Error + Send + Sync>> {
        let from: Vec<i64> = query.from_airport_ids.iter().copied().collect();
        let to: Vec<i64> = query.to_airport_ids.iter().copied().collect();

        let rows = sqlx::query_as::<_, TripRow>(ONE_WAY_SQL)
            .bind(from)
            .bind(to)
            .bind(query.departure.start)
            .bind(query.departure.end)
            .bind(i64::from(page.limit))
            .bind(i64::try_from(page.offset())?)
            .fetch_all(&self.pool)
            .await?;

        debug!("One-way query matched {} trip row(s)", rows.len());
        let items = self.hydrate(rows).await?;
        Ok(Page { items, page: page.page, limit: page.limit })
    }

    async fn find_round_trip(
        &self,
        query: &RoundTripQuery,
        page: PageRequest,
    ) -> Result<Page<Trip>, Box<dyn Error + Send + Sync>> {
        let outbound = &query.outbound;
        let from: Vec<i64> = outbound.from_airport_ids.iter().copied().collect();
        let to: Vec<i64> = outbound.to_airport_ids.iter().copied().collect();

        let rows = sqlx::query_as::<_, TripRow>(ROUND_TRIP_SQL)
            .bind(from)
            .bind(to)
            .bind(outbound.departure.start)
            .bind(outbound.departure.end)
            .bind(query.return_window.start)
            .bind(query.return_window.end)
            .bind(i64::from(page.limit))
            .bind(i64::try_from(page.offset())?)
            .fetch_all(&self.pool)
            .await?;

        debug!("Round-trip query matched {} trip row(s)", rows.len());
        let items = self.hydrate(rows).await?;
        Ok(Page { items, page: page.page, limit: page.limit })
    }
}
