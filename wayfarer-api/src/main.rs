use std::sync::Arc;
use std::net::SocketAddr;
use anyhow::Context;
use wayfarer_api::{app, state::{AppState, AuthConfig}};
use wayfarer_core::TripSearchService;
use wayfarer_store::{DbClient, PgAirportRepository, PgTripRepository, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer_api=debug,wayfarer_core=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = wayfarer_store::app_config::Config::load().context("Failed to load config")?;
    tracing::info!("Starting Wayfarer API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let airports = Arc::new(PgAirportRepository::new(db.pool.clone()));
    let trips = Arc::new(PgTripRepository::new(db.pool.clone()));
    let search = TripSearchService::new(airports.clone(), trips, config.search.settings());

    // Redis (rate limiting only)
    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url).await.context("Failed to configure Redis")?,
        )),
        None => {
            tracing::info!("No Redis configured, rate limiting disabled");
            None
        }
    };

    let app_state = AppState {
        search: Arc::new(search),
        airports,
        redis,
        rate_limit: config.rate_limit.clone(),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>()
    ).await?;

    Ok(())
}
