use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use wayfarer_api::{app, auth::issue_token, state::AuthConfig, AppState};
use wayfarer_core::model::{Airline, Airport, Flight, Location, Price, Provider};
use wayfarer_core::{SearchSettings, TripSearchService};
use wayfarer_store::app_config::RateLimitConfig;
use wayfarer_store::{MemoryStore, TripRecord};

const SECRET: &str = "test-secret";

// 2024-06-01T10:00:00Z
const JUNE_FIRST: i64 = 1_717_236_000;

/// Madrid (location 1: MAD=1, TOJ=3) to Paris (location 2: CDG=2), one
/// direct trip on 2024-06-01 priced at 500 and 650.
async fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    for (id, name) in [(1, "Madrid"), (2, "Paris")] {
        store
            .insert_location(Location { id, country: "EU".to_string(), name: name.to_string(), image: None })
            .await
            .unwrap();
    }
    for (id, code, location_id) in [(1, "MAD", 1), (2, "CDG", 2), (3, "TOJ", 1)] {
        store
            .insert_airport(Airport { id, code: code.to_string(), name: code.to_string(), location_id })
            .await
            .unwrap();
    }
    store.insert_airline(Airline { id: 1, name: "Air Europa".to_string() }).await.unwrap();
    store.insert_provider(Provider { id: 1, name: "Kayak".to_string() }).await.unwrap();

    let departs = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
    store
        .insert_flight(Flight {
            id: 1,
            name: "UX1027".to_string(),
            departure_airport_id: 1,
            arrival_airport_id: 2,
            airline_id: 1,
            departure_time: departs,
            arrival_time: departs + Duration::hours(2),
        })
        .await
        .unwrap();

    for (id, amount) in [(1, 650), (2, 500)] {
        store
            .insert_price(Price {
                id,
                provider: Provider { id: 1, name: "Kayak".to_string() },
                amount,
                currency: "EUR".to_string(),
            })
            .await
            .unwrap();
    }

    // A direct trip: the arrival leg is the same flight.
    let record = TripRecord {
        leave_arrival_flight_id: Some(1),
        price_ids: vec![1, 2],
        ..TripRecord::new(1, 1)
    };
    store.insert_trip(record).await.unwrap();

    Arc::new(store)
}

async fn router() -> Router {
    let store = seeded_store().await;
    let search = TripSearchService::new(store.clone(), store.clone(), SearchSettings::default());

    app(AppState {
        search: Arc::new(search),
        airports: store,
        redis: None,
        rate_limit: RateLimitConfig::default(),
        auth: AuthConfig { secret: SECRET.to_string(), expiration: 3600 },
    })
}

fn token(role: &str) -> String {
    issue_token(SECRET, 3600, "tester".to_string(), role).unwrap()
}

async fn send(app: Router, method: &str, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = bearer {
        builder = builder.header("Authorization", format!("Bearer {}", t));
    }

    let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn search(query: &str) -> (StatusCode, Value) {
    let uri = format!("/v1/trips/search?{}", query);
    send(router().await, "GET", &uri, Some(&token("CUSTOMER"))).await
}

#[tokio::test]
async fn test_direct_one_way_search() {
    let (status, body) = search(&format!("fromAirportId=1&toAirportId=2&fromDate={}&l=10&p=0", JUNE_FIRST)).await;

    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().expect("array of results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], 1);
    assert_eq!(results[0]["leaveStopCount"], 1);
    assert_eq!(results[0]["returnStopCount"], 0);
    assert_eq!(results[0]["minPrice"]["amount"], 500);
    assert_eq!(results[0]["minPrice"]["provider"]["name"], "Kayak");
}

#[tokio::test]
async fn test_location_search_matches_airport_search() {
    let by_location = search(&format!("fromLocationId=1&toLocationId=2&fromDate={}&l=10&p=0", JUNE_FIRST)).await;
    let by_airport = search(&format!("fromAirportId=1&toAirportId=2&fromDate={}&l=10&p=0", JUNE_FIRST)).await;

    assert_eq!(by_location.0, StatusCode::OK);
    assert_eq!(by_location, by_airport);
}

#[tokio::test]
async fn test_no_trips_is_not_found() {
    // 2024-07-01T10:00:00Z
    let (status, body) = search("fromAirportId=1&toAirportId=2&fromDate=1719828000&l=10&p=0").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No trips found");
}

#[tokio::test]
async fn test_round_trip_without_return_leg_is_not_found() {
    let (status, _) = search(&format!(
        "fromAirportId=1&toAirportId=2&fromDate={}&toDate={}&l=10&p=0",
        JUNE_FIRST,
        JUNE_FIRST + 7 * 86_400
    ))
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conflicting_origin_is_rejected() {
    let (status, body) = search(&format!(
        "fromAirportId=1&fromLocationId=1&toAirportId=2&fromDate={}&l=10&p=0",
        JUNE_FIRST
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("fromAirportId and fromLocationId"), "{}", message);
}

#[tokio::test]
async fn test_malformed_parameters_are_named() {
    let cases = [
        (format!("fromAirportId=1&toAirportId=two&fromDate={}&l=10&p=0", JUNE_FIRST), "toAirportId"),
        ("fromAirportId=1&toAirportId=2&fromDate=yesterday&l=10&p=0".to_string(), "fromDate"),
        (format!("fromAirportId=1&toAirportId=2&fromDate={}&p=0", JUNE_FIRST), "l is required"),
        (format!("fromAirportId=1&toAirportId=2&fromDate={}&l=0&p=0", JUNE_FIRST), "l must be"),
        (format!("toAirportId=2&fromDate={}&l=10&p=0", JUNE_FIRST), "fromAirportId or fromLocationId"),
    ];

    for (query, expected) in cases {
        let (status, body) = search(&query).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains(expected), "{} -> {}", query, message);
    }
}

#[tokio::test]
async fn test_repeated_parameter_is_a_json_bad_request() {
    let (status, body) = search(&format!(
        "fromAirportId=1&fromAirportId=3&toAirportId=2&fromDate={}&l=10&p=0",
        JUNE_FIRST
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{}", body);
}

#[tokio::test]
async fn test_search_requires_token() {
    let uri = format!("/v1/trips/search?fromAirportId=1&toAirportId=2&fromDate={}&l=10&p=0", JUNE_FIRST);

    let (status, body) = send(router().await, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing Authorization header");

    let (status, body) = send(router().await, "GET", &uri, Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");

    let (status, body) = send(router().await, "GET", &uri, Some(&token("SUPPLIER"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("SUPPLIER"));
}

#[tokio::test]
async fn test_guest_token_grants_search() {
    let (status, body) = send(router().await, "POST", "/v1/auth/guest", None).await;
    assert_eq!(status, StatusCode::OK);
    let guest = body["token"].as_str().unwrap().to_string();

    let uri = format!("/v1/trips/search?fromAirportId=1&toAirportId=2&fromDate={}&l=10&p=0", JUNE_FIRST);
    let (status, _) = send(router().await, "GET", &uri, Some(&guest)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_airport_lookups() {
    let bearer = token("GUEST");

    let (status, body) = send(router().await, "GET", "/v1/airports/3", Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "TOJ");
    assert_eq!(body["locationId"], 1);

    let (status, _) = send(router().await, "GET", "/v1/airports/99", Some(&bearer)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(router().await, "GET", "/v1/locations/1/airports", Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = send(router().await, "GET", "/v1/locations/9/airports", Some(&bearer)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_is_public() {
    let (status, body) = send(router().await, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
