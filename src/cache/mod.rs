use crate::redis_client::RedisClient;

pub mod seats;

/// Кеш схем залов в Redis. Ошибки Redis только логируются: запрос всегда
/// можно обслужить из хранилища.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    seat_ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, seat_ttl_seconds: u64) -> Self {
        Self { redis, seat_ttl_seconds }
    }

    pub async fn is_healthy(&self) -> bool {
        self.redis.ping().await.is_ok()
    }
}
