use axum::{
    extract::{Path, State},
    routing::get,
    Json,
    Router,
};
use wayfarer_core::model::{Airport, AirportId, LocationId};

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/airports/{id}", get(get_airport))
        .route("/v1/locations/{id}/airports", get(list_location_airports))
}

/// GET /v1/airports/{id}
async fn get_airport(
    State(state): State<AppState>,
    Path(id): Path<AirportId>,
) -> Result<Json<Airport>, AppError> {
    let airport = state.airports.get_airport(id).await
        .map_err(|e| AppError::InternalServerError(format!("Airport lookup failed: {}", e)))?
        .ok_or_else(|| AppError::NotFoundError(format!("Airport {} not found", id)))?;

    Ok(Json(airport))
}

/// GET /v1/locations/{id}/airports
async fn list_location_airports(
    State(state): State<AppState>,
    Path(id): Path<LocationId>,
) -> Result<Json<Vec<Airport>>, AppError> {
    state.airports.get_location(id).await
        .map_err(|e| AppError::InternalServerError(format!("Location lookup failed: {}", e)))?
        .ok_or_else(|| AppError::NotFoundError(format!("Location {} not found", id)))?;

    let airports = state.airports.list_airports_by_location(id).await
        .map_err(|e| AppError::InternalServerError(format!("Airport lookup failed: {}", e)))?;

    Ok(Json(airports))
}
