use std::sync::Arc;

use wayfarer_core::repository::AirportRepository;
use wayfarer_core::TripSearchService;
use wayfarer_store::app_config::RateLimitConfig;
use wayfarer_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<TripSearchService>,
    pub airports: Arc<dyn AirportRepository>,
    /// Rate limiting is skipped when no Redis is configured.
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
}
