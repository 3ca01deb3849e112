use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::model::Trip;
use crate::query::{Page, PageRequest, TripQuery};
use crate::repository::{AirportRepository, TripRepository};
use crate::resolver::{self, Endpoint, Side};
use crate::shaper::{shape, TripSearchResult};
use crate::window::{self, DEFAULT_WINDOW_DAYS};
use crate::{SearchError, SearchResult};

pub const NO_TRIPS_FOUND: &str = "No trips found";

/// Raw search parameters exactly as they arrive on the query string.
/// Everything is a string so a bad value can be reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSearchParams {
    pub from_airport_id: Option<String>,
    pub from_location_id: Option<String>,
    pub to_airport_id: Option<String>,
    pub to_location_id: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    #[serde(rename = "l")]
    pub limit: Option<String>,
    #[serde(rename = "p")]
    pub page: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub window_days: u32,
    pub max_page_size: u32,
    pub query_timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            max_page_size: 100,
            query_timeout: Duration::from_secs(5),
        }
    }
}

/// The request once every parameter is present and well-typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub from: Endpoint,
    pub to: Endpoint,
    pub from_date: String,
    pub to_date: Option<String>,
    pub page: PageRequest,
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_int(name: &str, raw: Option<&str>) -> SearchResult<Option<i64>> {
    present(raw)
        .map(|value| {
            value
                .parse::<i64>()
                .map_err(|_| SearchError::InvalidQuery(format!("{} must be an integer, got '{}'", name, value)))
        })
        .transpose()
}

fn required_int(name: &str, raw: Option<&str>) -> SearchResult<i64> {
    parse_int(name, raw)?.ok_or_else(|| SearchError::InvalidQuery(format!("{} is required", name)))
}

impl SearchRequest {
    pub fn from_params(params: &TripSearchParams, max_page_size: u32) -> SearchResult<Self> {
        let from = Endpoint::select(
            Side::From,
            parse_int(Side::From.airport_param(), params.from_airport_id.as_deref())?,
            parse_int(Side::From.location_param(), params.from_location_id.as_deref())?,
        )?;
        let to = Endpoint::select(
            Side::To,
            parse_int(Side::To.airport_param(), params.to_airport_id.as_deref())?,
            parse_int(Side::To.location_param(), params.to_location_id.as_deref())?,
        )?;

        let from_date = present(params.from_date.as_deref())
            .ok_or_else(|| SearchError::InvalidQuery("fromDate is required".to_string()))?
            .to_string();
        let to_date = present(params.to_date.as_deref()).map(str::to_string);

        let limit = required_int("l", params.limit.as_deref())?;
        let page = required_int("p", params.page.as_deref())?;

        if limit <= 0 {
            return Err(SearchError::InvalidQuery("l must be greater than zero".to_string()));
        }
        if page < 0 {
            return Err(SearchError::InvalidQuery("p must not be negative".to_string()));
        }

        let page = u32::try_from(page)
            .map_err(|_| SearchError::InvalidQuery(format!("p is out of range: {}", page)))?;
        let limit = u32::try_from(limit.min(i64::from(max_page_size))).unwrap_or(max_page_size);

        Ok(Self {
            from,
            to,
            from_date,
            to_date,
            page: PageRequest { page, limit },
        })
    }
}

fn attribute(param: &str, err: SearchError) -> SearchError {
    match err {
        SearchError::InvalidTimestamp(reason) => SearchError::InvalidQuery(format!("{}: {}", param, reason)),
        other => other,
    }
}

/// Drives one search from raw parameters to a page of shaped results.
pub struct TripSearchService {
    airports: Arc<dyn AirportRepository>,
    trips: Arc<dyn TripRepository>,
    settings: SearchSettings,
}

impl TripSearchService {
    pub fn new(
        airports: Arc<dyn AirportRepository>,
        trips: Arc<dyn TripRepository>,
        settings: SearchSettings,
    ) -> Self {
        Self { airports, trips, settings }
    }

    /// Airport resolution and the trip query share one deadline.
    pub async fn search(&self, params: &TripSearchParams) -> SearchResult<Vec<TripSearchResult>> {
        let request = SearchRequest::from_params(params, self.settings.max_page_size)?;

        match tokio::time::timeout(self.settings.query_timeout, self.execute(&request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Trip search exceeded {:?}", self.settings.query_timeout);
                Err(SearchError::Timeout(self.settings.query_timeout))
            }
        }
    }

    async fn execute(&self, request: &SearchRequest) -> SearchResult<Vec<TripSearchResult>> {
        let query = self.build_query(request).await?;

        if query.has_empty_route() {
            info!("No airports for {:?} -> {:?}", request.from, request.to);
            return Err(SearchError::NotFound(NO_TRIPS_FOUND.to_string()));
        }

        let page = self.run_query(&query, request.page).await?;
        let results: Vec<TripSearchResult> = page.items.into_iter().map(shape).collect();

        if results.is_empty() {
            return Err(SearchError::NotFound(NO_TRIPS_FOUND.to_string()));
        }

        info!(
            "Trip search ({}) returned {} result(s) for page {}",
            query.kind(),
            results.len(),
            request.page.page
        );
        Ok(results)
    }

    /// Resolve both endpoints, then build the date windows.
    pub async fn build_query(&self, request: &SearchRequest) -> SearchResult<TripQuery> {
        let from_ids = resolver::resolve(self.airports.as_ref(), request.from).await?;
        let to_ids = resolver::resolve(self.airports.as_ref(), request.to).await?;

        let days = self.settings.window_days;
        let departure = window::parse_window(&request.from_date, days).map_err(|e| attribute("fromDate", e))?;
        let return_window = match &request.to_date {
            Some(raw) => Some(window::parse_window(raw, days).map_err(|e| attribute("toDate", e))?),
            None => None,
        };

        if let Some(back) = &return_window {
            if back.start < departure.start {
                return Err(SearchError::InvalidQuery("toDate must not be before fromDate".to_string()));
            }
        }

        let query = TripQuery::new(from_ids, to_ids, departure, return_window);
        debug!("Built {} query: {:?}", query.kind(), query);
        Ok(query)
    }

    async fn run_query(&self, query: &TripQuery, page: PageRequest) -> SearchResult<Page<Trip>> {
        let found = match query {
            TripQuery::OneWay(q) => self.trips.find_one_way(q, page).await,
            TripQuery::RoundTrip(q) => self.trips.find_round_trip(q, page).await,
        };

        found.map_err(|e| {
            error!("Trip query failed: {}", e);
            SearchError::Storage(e.to_string())
        })
    }
}
