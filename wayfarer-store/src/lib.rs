pub mod app_config;
pub mod database;
pub mod redis_repo;
pub mod airport_repo;
pub mod trip_repo;
pub mod memory;

pub use airport_repo::PgAirportRepository;
pub use database::DbClient;
pub use memory::{MemoryStore, TripRecord};
pub use redis_repo::RedisClient;
pub use trip_repo::PgTripRepository;
