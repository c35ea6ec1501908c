use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

// Без url работаем на хранилище в памяти
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

// Без url кеш схемы зала выключен
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub seat_cache_ttl_seconds: u64,
}

// Путь к JSON сиду; по умолчанию встроенный набор
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedConfig {
    pub path: Option<String>,
}

// Плоские переменные окружения, которые понимаем без префикса
const FLAT_VARS: &[(&str, &str)] = &[
    ("HOST", "app.host"),
    ("PORT", "app.port"),
    ("ENVIRONMENT", "app.environment"),
    ("RUST_LOG", "app.rust_log"),
    ("LOG_FORMAT", "app.log_format"),
    ("DATABASE_URL", "database.url"),
    ("DB_POOL_SIZE", "database.pool_size"),
    ("REDIS_URL", "redis.url"),
    ("SEAT_CACHE_TTL_SECONDS", "redis.seat_cache_ttl_seconds"),
    ("SEED_PATH", "seed.path"),
];

impl Config {
    /// Дефолты -> `cinema.toml` (если есть) -> `CINEMA__*` -> плоские переменные.
    pub fn from_env() -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(File::with_name("cinema").required(false))
            .add_source(Environment::with_prefix("CINEMA").separator("__"));
        Self::build(builder, |key| env::var(key).ok())
    }

    /// Только дефолты и `lookup` для плоских переменных. Удобно в тестах.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::build(config::Config::builder(), lookup)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = builder
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "cinema_reservation=debug,tower_http=debug")?
            .set_default("app.log_format", "pretty")?
            .set_default("database.pool_size", 20)?
            .set_default("database.acquire_timeout_seconds", 5)?
            .set_default("redis.seat_cache_ttl_seconds", 60)?;

        for (var, key) in FLAT_VARS {
            builder = builder.set_override_option(*key, lookup(var).filter(|v| !v.is_empty()))?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}
