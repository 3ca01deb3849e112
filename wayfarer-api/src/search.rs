use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json,
    Router,
};
use wayfarer_core::{TripSearchParams, TripSearchResult};

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/trips/search", get(search_trips))
}

/// GET /v1/trips/search
async fn search_trips(
    State(state): State<AppState>,
    params: Result<Query<TripSearchParams>, QueryRejection>,
) -> Result<Json<Vec<TripSearchResult>>, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;
    let results = state.search.search(&params).await?;
    Ok(Json(results))
}
