pub mod cache;
pub mod catalog;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod redis_client;
pub mod reservation;
pub mod seed;
pub mod store;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::error::StartupError;
use crate::reservation::ReservationEngine;
use crate::seed::{SeedData, SeedError};
use crate::store::{InMemorySeatStore, PgSeatStore, SeatBackend};

// Shared state для всего приложения
pub struct AppState {
    pub engine: ReservationEngine<SeatBackend>,
    pub cache: Option<cache::CacheService>,
    pub config: config::Config,
}

impl AppState {
    /// Поднимает хранилище по конфигу: Postgres при `DATABASE_URL`, иначе
    /// память. Redis необязателен, без него кеш просто выключен.
    pub async fn new(config: config::Config) -> Result<Arc<Self>, StartupError> {
        let seed = match &config.seed.path {
            Some(path) => SeedData::from_file(path)?,
            None => SeedData::default(),
        };
        seed.validate()?;
        let summary = seed.summary();
        info!(
            cinemas = summary.cinemas,
            halls = summary.halls,
            seats = summary.seats,
            held = summary.held,
            "Seed loaded"
        );

        let backend = match &config.database.url {
            Some(url) => {
                let db = database::Database::connect(url, &config.database).await?;
                db.run_migrations().await?;
                let store = PgSeatStore::new(db);
                store.apply_seed(&seed).await?;
                SeatBackend::Postgres(store)
            }
            None => SeatBackend::Memory(InMemorySeatStore::from_seed(&seed)?),
        };
        info!(backend = backend.name(), "Seat store ready");

        let cache = match &config.redis.url {
            Some(url) => match redis_client::RedisClient::new(url).await {
                Ok(redis) => {
                    info!("Redis connected, seat cache enabled");
                    Some(cache::CacheService::new(redis, config.redis.seat_cache_ttl_seconds))
                }
                Err(e) => {
                    warn!(error = %e, "Redis unavailable, seat cache disabled");
                    None
                }
            },
            None => None,
        };

        Ok(Arc::new(Self { engine: ReservationEngine::new(backend), cache, config }))
    }

    /// Состояние на хранилище в памяти без кеша.
    pub fn in_memory(seed: &SeedData, config: config::Config) -> Result<Arc<Self>, SeedError> {
        let store = InMemorySeatStore::from_seed(seed)?;
        Ok(Arc::new(Self {
            engine: ReservationEngine::new(SeatBackend::Memory(store)),
            cache: None,
            config,
        }))
    }

    pub fn store(&self) -> &SeatBackend {
        self.engine.store()
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cinema Reservation API v1.0" }))
        .route("/health", get(controllers::health::health))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
