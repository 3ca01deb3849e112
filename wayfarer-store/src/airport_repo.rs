use async_trait::async_trait;
use sqlx::PgPool;
use std::error::Error;

use wayfarer_core::model::{Airport, AirportId, Location, LocationId};
use wayfarer_core::repository::AirportRepository;

pub struct PgAirportRepository {
    pool: PgPool,
}

impl PgAirportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AirportRow {
    id: i64,
    code: String,
    name: String,
    location_id: i64,
}

impl From<AirportRow> for Airport {
    fn from(row: AirportRow) -> Self {
        Airport {
            id: row.id,
            code: row.code,
            name: row.name,
            location_id: row.location_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: i64,
    country: String,
    name: String,
    image: Option<String>,
}

#[async_trait]
impl AirportRepository for PgAirportRepository {
    async fn get_airport(
        &self,
        id: AirportId,
    ) -> Result<Option<Airport>, Box<dyn Error + Send + Sync>> {
        let row = sqlx::query_as::<_, AirportRow>(
            "SELECT id, code, name, location_id FROM airports WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Airport::from))
    }

    async fn get_location(
        &self,
        id: LocationId,
    ) -> Result<Option<Location>, Box<dyn Error + Send + Sync>> {
        let row = sqlx::query_as::<_, LocationRow>(
            "SELECT id, country, name, image FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Location {
            id: row.id,
            country: row.country,
            name: row.name,
            image: row.image,
        }))
    }

    async fn list_airports_by_location(
        &self,
        location_id: LocationId,
    ) -> Result<Vec<Airport>, Box<dyn Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, AirportRow>(
            "SELECT id, code, name, location_id FROM airports WHERE location_id = $1 ORDER BY id",
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Airport::from).collect())
    }
}
