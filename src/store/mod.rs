//! Хранилище мест: единственный источник правды о `(status, holder)`.
//!
//! Все изменения брони идут через [`SeatStore::compare_and_transition`]:
//! проверка ожидаемого состояния и запись нового выполняются одной атомарной
//! операцией, без отдельного чтения перед записью.

pub mod memory;
pub mod postgres;

use std::future::Future;

use crate::catalog::CatalogProjection;
use crate::error::StoreError;
use crate::models::{Cinema, CinemaId, Hall, HallId, Phone, Reservation, Seat, SeatId, SeatLocator};

pub use memory::InMemorySeatStore;
pub use postgres::PgSeatStore;

/// Результат compare-and-transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Состояние совпало и было заменено; внутри место после изменения.
    Applied(Seat),
    /// Текущее состояние не совпало с ожидаемым, ничего не изменено.
    Conflict,
}

pub trait SeatStore: Send + Sync {
    /// Ищет место в зале кинотеатра. Различает отсутствие кинотеатра,
    /// зала и места.
    fn find_seat(
        &self,
        cinema_id: CinemaId,
        hall_id: HallId,
        locator: SeatLocator,
    ) -> impl Future<Output = Result<Seat, StoreError>> + Send;

    /// Текущее состояние места по id, `None` если места нет.
    fn get_seat(&self, seat_id: SeatId) -> impl Future<Output = Result<Option<Seat>, StoreError>> + Send;

    /// Атомарно: если бронь места равна `expected`, записывает `next`.
    /// Сравнивается и статус, и держатель.
    fn compare_and_transition(
        &self,
        seat_id: SeatId,
        expected: &Reservation,
        next: Reservation,
    ) -> impl Future<Output = Result<Transition, StoreError>> + Send;

    /// Все места, которые сейчас держит `holder`, по порядку
    /// (кинотеатр, зал, ряд, место).
    fn seats_held_by(
        &self,
        holder: &Phone,
        cinema_id: Option<CinemaId>,
    ) -> impl Future<Output = Result<Vec<Seat>, StoreError>> + Send;
}

/// Бэкенд, выбранный конфигурацией при старте.
#[derive(Clone)]
pub enum SeatBackend {
    Memory(InMemorySeatStore),
    Postgres(PgSeatStore),
}

impl SeatBackend {
    pub fn name(&self) -> &'static str {
        match self {
            SeatBackend::Memory(_) => "memory",
            SeatBackend::Postgres(_) => "postgres",
        }
    }
}

impl SeatStore for SeatBackend {
    async fn find_seat(
        &self,
        cinema_id: CinemaId,
        hall_id: HallId,
        locator: SeatLocator,
    ) -> Result<Seat, StoreError> {
        match self {
            SeatBackend::Memory(store) => store.find_seat(cinema_id, hall_id, locator).await,
            SeatBackend::Postgres(store) => store.find_seat(cinema_id, hall_id, locator).await,
        }
    }

    async fn get_seat(&self, seat_id: SeatId) -> Result<Option<Seat>, StoreError> {
        match self {
            SeatBackend::Memory(store) => store.get_seat(seat_id).await,
            SeatBackend::Postgres(store) => store.get_seat(seat_id).await,
        }
    }

    async fn compare_and_transition(
        &self,
        seat_id: SeatId,
        expected: &Reservation,
        next: Reservation,
    ) -> Result<Transition, StoreError> {
        match self {
            SeatBackend::Memory(store) => store.compare_and_transition(seat_id, expected, next).await,
            SeatBackend::Postgres(store) => {
                store.compare_and_transition(seat_id, expected, next).await
            }
        }
    }

    async fn seats_held_by(
        &self,
        holder: &Phone,
        cinema_id: Option<CinemaId>,
    ) -> Result<Vec<Seat>, StoreError> {
        match self {
            SeatBackend::Memory(store) => store.seats_held_by(holder, cinema_id).await,
            SeatBackend::Postgres(store) => store.seats_held_by(holder, cinema_id).await,
        }
    }
}

impl CatalogProjection for SeatBackend {
    async fn cinemas(&self) -> Result<Vec<Cinema>, StoreError> {
        match self {
            SeatBackend::Memory(store) => store.cinemas().await,
            SeatBackend::Postgres(store) => store.cinemas().await,
        }
    }

    async fn halls(&self, cinema_id: CinemaId) -> Result<Vec<Hall>, StoreError> {
        match self {
            SeatBackend::Memory(store) => store.halls(cinema_id).await,
            SeatBackend::Postgres(store) => store.halls(cinema_id).await,
        }
    }

    async fn seats(&self, cinema_id: CinemaId, hall_id: HallId) -> Result<Vec<Seat>, StoreError> {
        match self {
            SeatBackend::Memory(store) => store.seats(cinema_id, hall_id).await,
            SeatBackend::Postgres(store) => store.seats(cinema_id, hall_id).await,
        }
    }
}
