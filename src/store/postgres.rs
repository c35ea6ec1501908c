use sqlx::FromRow;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::catalog::CatalogProjection;
use crate::database::Database;
use crate::error::{NotFoundKind, StoreError};
use crate::models::{
    Cinema, CinemaId, Hall, HallId, Phone, Reservation, Seat, SeatId, SeatLocator, SeatStatus,
};
use crate::seed::SeedData;

use super::{SeatStore, Transition};

const SEAT_COLUMNS: &str = "id, hall_id, row, place, status, holder_phone";

/// Хранилище поверх Postgres. Переход состояния - один условный `UPDATE`,
/// поэтому гонку между проверкой и записью закрывает сама база.
#[derive(Clone)]
pub struct PgSeatStore {
    db: Database,
}

#[derive(Debug, FromRow)]
struct SeatRow {
    id: i64,
    hall_id: i64,
    row: i32,
    place: i32,
    status: String,
    holder_phone: Option<String>,
}

impl SeatRow {
    fn into_seat(self) -> Result<Seat, StoreError> {
        let status = SeatStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("seat {} has unknown status {:?}", self.id, self.status))
        })?;
        let holder = self
            .holder_phone
            .as_deref()
            .map(Phone::parse)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("seat {} holder: {}", self.id, e)))?;
        let reservation = match (status, holder) {
            (SeatStatus::Free, None) => Reservation::Free,
            (SeatStatus::Held, Some(phone)) => Reservation::Held(phone),
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "seat {} status and holder disagree",
                    self.id
                )))
            }
        };
        Ok(Seat {
            id: SeatId(self.id),
            hall_id: HallId(self.hall_id),
            row: self.row,
            place: self.place,
            reservation,
        })
    }
}

#[derive(Debug, FromRow)]
struct CinemaRow {
    id: i64,
    name: String,
    address: String,
}

#[derive(Debug, FromRow)]
struct HallRow {
    id: i64,
    number: i32,
    cinema_id: i64,
}

impl From<HallRow> for Hall {
    fn from(row: HallRow) -> Self {
        Hall { id: HallId(row.id), number: row.number, cinema_id: CinemaId(row.cinema_id) }
    }
}

// Колонки (status, holder_phone) для бронирования.
fn columns(reservation: &Reservation) -> (&'static str, Option<&str>) {
    (reservation.status().as_str(), reservation.holder().map(Phone::as_str))
}

impl PgSeatStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Заливает сид одной транзакцией. Уже существующие строки не трогаем,
    /// так что состояние броней переживает рестарт.
    pub async fn apply_seed(&self, seed: &SeedData) -> Result<u64, StoreError> {
        let mut tx = self.db.pool.begin().await?;
        let mut inserted = 0;

        for cinema in &seed.cinemas {
            sqlx::query(
                "INSERT INTO cinemas (id, name, address) VALUES ($1, $2, $3)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(cinema.id.0)
            .bind(&cinema.name)
            .bind(&cinema.address)
            .execute(&mut *tx)
            .await?;

            for hall in &cinema.halls {
                sqlx::query(
                    "INSERT INTO halls (id, number, cinema_id) VALUES ($1, $2, $3)
                     ON CONFLICT (id) DO NOTHING",
                )
                .bind(hall.id.0)
                .bind(hall.number)
                .bind(cinema.id.0)
                .execute(&mut *tx)
                .await?;

                for seat in &hall.seats {
                    let status = if seat.holder_phone.is_some() {
                        SeatStatus::Held
                    } else {
                        SeatStatus::Free
                    };
                    let result = sqlx::query(
                        "INSERT INTO seats (id, hall_id, row, place, status, holder_phone)
                         VALUES ($1, $2, $3, $4, $5, $6)
                         ON CONFLICT (id) DO NOTHING",
                    )
                    .bind(seat.id.0)
                    .bind(hall.id.0)
                    .bind(seat.row)
                    .bind(seat.place)
                    .bind(status.as_str())
                    .bind(seat.holder_phone.as_ref().map(Phone::as_str))
                    .execute(&mut *tx)
                    .await?;
                    inserted += result.rows_affected();
                }
            }
        }

        tx.commit().await?;
        info!(inserted, "Seed applied");
        Ok(inserted)
    }

    async fn ensure_hall(&self, cinema_id: CinemaId, hall_id: HallId) -> Result<(), StoreError> {
        let (cinema_exists, hall_exists) = sqlx::query_as::<_, (bool, bool)>(
            "SELECT EXISTS(SELECT 1 FROM cinemas WHERE id = $1),
                    EXISTS(SELECT 1 FROM halls WHERE id = $2 AND cinema_id = $1)",
        )
        .bind(cinema_id.0)
        .bind(hall_id.0)
        .fetch_one(&self.db.pool)
        .await?;

        if !cinema_exists {
            return Err(StoreError::NotFound(NotFoundKind::Cinema(cinema_id)));
        }
        if !hall_exists {
            return Err(StoreError::NotFound(NotFoundKind::Hall(cinema_id, hall_id)));
        }
        Ok(())
    }
}

impl SeatStore for PgSeatStore {
    async fn find_seat(
        &self,
        cinema_id: CinemaId,
        hall_id: HallId,
        locator: SeatLocator,
    ) -> Result<Seat, StoreError> {
        self.ensure_hall(cinema_id, hall_id).await?;

        let row = match locator {
            SeatLocator::Id(seat_id) => {
                sqlx::query_as::<_, SeatRow>(&format!(
                    "SELECT {SEAT_COLUMNS} FROM seats WHERE hall_id = $1 AND id = $2"
                ))
                .bind(hall_id.0)
                .bind(seat_id.0)
                .fetch_optional(&self.db.pool)
                .await?
            }
            SeatLocator::Position { row, place } => {
                sqlx::query_as::<_, SeatRow>(&format!(
                    "SELECT {SEAT_COLUMNS} FROM seats WHERE hall_id = $1 AND row = $2 AND place = $3"
                ))
                .bind(hall_id.0)
                .bind(row)
                .bind(place)
                .fetch_optional(&self.db.pool)
                .await?
            }
        };

        row.ok_or(StoreError::NotFound(NotFoundKind::Seat(locator)))?.into_seat()
    }

    async fn get_seat(&self, seat_id: SeatId) -> Result<Option<Seat>, StoreError> {
        sqlx::query_as::<_, SeatRow>(&format!("SELECT {SEAT_COLUMNS} FROM seats WHERE id = $1"))
            .bind(seat_id.0)
            .fetch_optional(&self.db.pool)
            .await?
            .map(SeatRow::into_seat)
            .transpose()
    }

    async fn compare_and_transition(
        &self,
        seat_id: SeatId,
        expected: &Reservation,
        next: Reservation,
    ) -> Result<Transition, StoreError> {
        let (expected_status, expected_holder) = columns(expected);
        let (next_status, next_holder) = columns(&next);

        let updated = sqlx::query_as::<_, SeatRow>(&format!(
            "UPDATE seats SET status = $2, holder_phone = $3
             WHERE id = $1 AND status = $4 AND holder_phone IS NOT DISTINCT FROM $5
             RETURNING {SEAT_COLUMNS}"
        ))
        .bind(seat_id.0)
        .bind(next_status)
        .bind(next_holder)
        .bind(expected_status)
        .bind(expected_holder)
        .fetch_optional(&self.db.pool)
        .await?;

        match updated {
            Some(row) => Ok(Transition::Applied(row.into_seat()?)),
            None => {
                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM seats WHERE id = $1)",
                )
                .bind(seat_id.0)
                .fetch_one(&self.db.pool)
                .await?;
                if !exists {
                    return Err(StoreError::NotFound(NotFoundKind::Seat(SeatLocator::Id(seat_id))));
                }
                debug!(%seat_id, "compare-and-transition conflict");
                Ok(Transition::Conflict)
            }
        }
    }

    async fn seats_held_by(
        &self,
        holder: &Phone,
        cinema_id: Option<CinemaId>,
    ) -> Result<Vec<Seat>, StoreError> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT s.id, s.hall_id, s.row, s.place, s.status, s.holder_phone
             FROM seats s
             JOIN halls h ON h.id = s.hall_id
             WHERE s.status = 'HELD' AND s.holder_phone = $1
               AND ($2::BIGINT IS NULL OR h.cinema_id = $2)
             ORDER BY h.cinema_id, s.hall_id, s.row, s.place",
        )
        .bind(holder.as_str())
        .bind(cinema_id.map(|id| id.0))
        .fetch_all(&self.db.pool)
        .await?;

        rows.into_iter().map(SeatRow::into_seat).collect()
    }
}

impl CatalogProjection for PgSeatStore {
    async fn cinemas(&self) -> Result<Vec<Cinema>, StoreError> {
        let cinemas = sqlx::query_as::<_, CinemaRow>(
            "SELECT id, name, address FROM cinemas ORDER BY id",
        )
        .fetch_all(&self.db.pool)
        .await?;
        let halls = sqlx::query_as::<_, HallRow>(
            "SELECT id, number, cinema_id FROM halls ORDER BY cinema_id, id",
        )
        .fetch_all(&self.db.pool)
        .await?;

        let mut by_cinema: BTreeMap<i64, Vec<Hall>> = BTreeMap::new();
        for hall in halls {
            by_cinema.entry(hall.cinema_id).or_default().push(hall.into());
        }

        Ok(cinemas
            .into_iter()
            .map(|c| Cinema {
                id: CinemaId(c.id),
                name: c.name,
                address: c.address,
                halls: by_cinema.remove(&c.id).unwrap_or_default(),
            })
            .collect())
    }

    async fn halls(&self, cinema_id: CinemaId) -> Result<Vec<Hall>, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM cinemas WHERE id = $1)")
            .bind(cinema_id.0)
            .fetch_one(&self.db.pool)
            .await?;
        if !exists {
            return Err(StoreError::NotFound(NotFoundKind::Cinema(cinema_id)));
        }

        let halls = sqlx::query_as::<_, HallRow>(
            "SELECT id, number, cinema_id FROM halls WHERE cinema_id = $1 ORDER BY id",
        )
        .bind(cinema_id.0)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(halls.into_iter().map(Hall::from).collect())
    }

    async fn seats(&self, cinema_id: CinemaId, hall_id: HallId) -> Result<Vec<Seat>, StoreError> {
        self.ensure_hall(cinema_id, hall_id).await?;

        let rows = sqlx::query_as::<_, SeatRow>(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE hall_id = $1 ORDER BY row, place"
        ))
        .bind(hall_id.0)
        .fetch_all(&self.db.pool)
        .await?;
        rows.into_iter().map(SeatRow::into_seat).collect()
    }
}
