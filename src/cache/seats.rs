use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::CacheService;
use crate::models::{CinemaId, HallId, Seat};

fn hall_key(cinema_id: CinemaId, hall_id: HallId) -> String {
    format!("seats:{}:{}", cinema_id, hall_id)
}

// Счётчик поколений схемы зала, растёт при каждой инвалидации
fn generation_key(cinema_id: CinemaId, hall_id: HallId) -> String {
    format!("seats:{}:{}:gen", cinema_id, hall_id)
}

/// Запись в кеше помнит поколение, прочитанное до похода в хранилище.
#[derive(Debug, Serialize, Deserialize)]
struct CachedHall {
    generation: u64,
    seats: Vec<Seat>,
}

impl CachedHall {
    // Запись из прошлого поколения могла быть положена после инвалидации
    fn into_fresh(self, current: u64) -> Option<Vec<Seat>> {
        (self.generation == current).then_some(self.seats)
    }
}

impl CacheService {
    /// Схема зала из кеша. `None` - промах, устаревшая запись или Redis недоступен.
    pub async fn get_hall_seats(&self, cinema_id: CinemaId, hall_id: HallId) -> Option<Vec<Seat>> {
        let key = hall_key(cinema_id, hall_id);
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<(Option<String>, Option<u64>)> = redis::pipe()
            .get(&key)
            .get(generation_key(cinema_id, hall_id))
            .query_async(&mut conn)
            .await;
        let (data, generation) = match result {
            Ok(values) => values,
            Err(e) => {
                warn!(%key, error = %e, "Seat cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<CachedHall>(&data?) {
            Ok(entry) => {
                let seats = entry.into_fresh(generation.unwrap_or(0));
                if seats.is_none() {
                    debug!(%key, "Skipping stale seat cache entry");
                }
                seats
            }
            Err(e) => {
                warn!(%key, error = %e, "Dropping unparsable seat cache entry");
                self.invalidate_hall(cinema_id, hall_id).await;
                None
            }
        }
    }

    /// Текущее поколение зала. Читать до запроса в хранилище и передать
    /// в [`CacheService::put_hall_seats`].
    pub async fn hall_generation(&self, cinema_id: CinemaId, hall_id: HallId) -> Option<u64> {
        let key = generation_key(cinema_id, hall_id);
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<Option<u64>> = conn.get(&key).await;
        match result {
            Ok(generation) => Some(generation.unwrap_or(0)),
            Err(e) => {
                warn!(%key, error = %e, "Seat cache generation read failed");
                None
            }
        }
    }

    pub async fn put_hall_seats(
        &self,
        cinema_id: CinemaId,
        hall_id: HallId,
        generation: u64,
        seats: &[Seat],
    ) {
        let key = hall_key(cinema_id, hall_id);
        let entry = CachedHall { generation, seats: seats.to_vec() };
        let data = match serde_json::to_string(&entry) {
            Ok(data) => data,
            Err(e) => {
                warn!(%key, error = %e, "Seat cache serialize failed");
                return;
            }
        };
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<()> = conn.set_ex(&key, data, self.seat_ttl_seconds).await;
        if let Err(e) = result {
            warn!(%key, error = %e, "Seat cache write failed");
        }
    }

    // Вызывается после каждого успешного reserve/release
    pub async fn invalidate_hall(&self, cinema_id: CinemaId, hall_id: HallId) {
        let key = hall_key(cinema_id, hall_id);
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<()> = redis::pipe()
            .atomic()
            .incr(generation_key(cinema_id, hall_id), 1)
            .ignore()
            .del(&key)
            .ignore()
            .query_async(&mut conn)
            .await;
        match result {
            Ok(()) => debug!(%key, "Invalidated seat cache"),
            Err(e) => warn!(%key, error = %e, "Seat cache invalidation failed"),
        }
    }
}
