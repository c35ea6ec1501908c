//! Жизненный цикл брони места: `Free -> Held(holder) -> Free`.
//!
//! Движок не хранит состояние мест между вызовами. Каждая операция - это
//! один compare-and-transition в хранилище с ожидаемым прежним состоянием.
//! Если хранилище ответило `Conflict`, место перечитывается, чтобы вернуть
//! точную доменную ошибку. Повторов внутри нет, это решает вызывающий.

use tracing::{debug, info};

use crate::error::{DenyReason, NotFoundKind, ReservationError};
use crate::models::{CinemaId, HallId, Phone, Reservation, Seat, SeatLocator};
use crate::store::{SeatStore, Transition};

#[derive(Clone)]
pub struct ReservationEngine<S> {
    store: S,
}

impl<S: SeatStore> ReservationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Free -> Held(holder). Занятое место (кем угодно, в том числе тем же
    /// телефоном) даёт `AlreadyReserved`.
    pub async fn reserve(&self, seat: &Seat, holder: &Phone) -> Result<Seat, ReservationError> {
        let outcome = self
            .store
            .compare_and_transition(seat.id, &Reservation::Free, Reservation::Held(holder.clone()))
            .await?;

        match outcome {
            Transition::Applied(updated) => {
                info!(seat_id = %updated.id, holder = %holder.masked(), "Seat reserved");
                Ok(updated)
            }
            Transition::Conflict => {
                let current = self.reread(seat).await?;
                debug!(
                    seat_id = %current.id,
                    status = current.status().as_str(),
                    "Reserve lost: seat is not free"
                );
                Err(ReservationError::AlreadyReserved)
            }
        }
    }

    /// Held(requester) -> Free. Свободное место или чужая бронь дают
    /// `NotAuthorized`.
    pub async fn release(&self, seat: &Seat, requester: &Phone) -> Result<Seat, ReservationError> {
        let outcome = self
            .store
            .compare_and_transition(seat.id, &Reservation::Held(requester.clone()), Reservation::Free)
            .await?;

        match outcome {
            Transition::Applied(updated) => {
                info!(seat_id = %updated.id, holder = %requester.masked(), "Seat released");
                Ok(updated)
            }
            Transition::Conflict => {
                let current = self.reread(seat).await?;
                let reason = match current.holder() {
                    Some(holder) if holder != requester => DenyReason::HeldByOther,
                    // свободно сейчас, либо успели снять и занять заново между
                    // нашим UPDATE и перечитыванием
                    _ => DenyReason::NotHeld,
                };
                debug!(seat_id = %current.id, ?reason, "Release denied");
                Err(ReservationError::NotAuthorized { reason })
            }
        }
    }

    /// Находит место по адресу и бронирует его.
    pub async fn reserve_at(
        &self,
        cinema_id: CinemaId,
        hall_id: HallId,
        locator: SeatLocator,
        holder: &Phone,
    ) -> Result<Seat, ReservationError> {
        let seat = self.store.find_seat(cinema_id, hall_id, locator).await?;
        self.reserve(&seat, holder).await
    }

    /// Находит место по адресу и снимает бронь.
    pub async fn release_at(
        &self,
        cinema_id: CinemaId,
        hall_id: HallId,
        locator: SeatLocator,
        requester: &Phone,
    ) -> Result<Seat, ReservationError> {
        let seat = self.store.find_seat(cinema_id, hall_id, locator).await?;
        self.release(&seat, requester).await
    }

    /// Места, которые сейчас держит `holder`. Ничего не меняет.
    pub async fn holder_reservations(
        &self,
        holder: &Phone,
        cinema_id: Option<CinemaId>,
    ) -> Result<Vec<Seat>, ReservationError> {
        Ok(self.store.seats_held_by(holder, cinema_id).await?)
    }

    async fn reread(&self, seat: &Seat) -> Result<Seat, ReservationError> {
        self.store
            .get_seat(seat.id)
            .await?
            .ok_or(ReservationError::NotFound(NotFoundKind::Seat(SeatLocator::Id(seat.id))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{SeatId, SeatStatus};
    use crate::seed::SeedData;
    use crate::store::InMemorySeatStore;

    fn engine() -> ReservationEngine<InMemorySeatStore> {
        ReservationEngine::new(InMemorySeatStore::from_seed(&SeedData::default()).unwrap())
    }

    fn phone(s: &str) -> Phone {
        Phone::parse(s).unwrap()
    }

    async fn seat(engine: &ReservationEngine<InMemorySeatStore>, id: i64) -> Seat {
        engine.store().get_seat(SeatId(id)).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn reserve_then_reserve_again() {
        let engine = engine();
        let s1 = seat(&engine, 1).await;

        let held = engine.reserve(&s1, &phone("555-0001")).await.unwrap();
        assert_eq!(held.status(), SeatStatus::Held);
        assert_eq!(held.holder(), Some(&phone("555-0001")));

        let err = engine.reserve(&s1, &phone("555-0002")).await.unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyReserved));

        // тот же телефон повторно - тоже ошибка
        let err = engine.reserve(&s1, &phone("555-0001")).await.unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyReserved));

        assert_eq!(seat(&engine, 1).await.holder(), Some(&phone("555-0001")));
    }

    #[tokio::test]
    async fn release_by_stranger_is_denied() {
        let engine = engine();
        let s2 = seat(&engine, 2).await;

        let err = engine.release(&s2, &phone("555-0002")).await.unwrap_err();
        assert!(matches!(
            err,
            ReservationError::NotAuthorized { reason: DenyReason::HeldByOther }
        ));
        assert_eq!(seat(&engine, 2).await.holder(), Some(&phone("89241278006")));

        let freed = engine.release(&s2, &phone("89241278006")).await.unwrap();
        assert_eq!(freed.reservation, Reservation::Free);
    }

    #[tokio::test]
    async fn release_of_free_seat_fails() {
        let engine = engine();
        let s1 = seat(&engine, 1).await;
        let err = engine.release(&s1, &phone("555-0001")).await.unwrap_err();
        assert!(matches!(err, ReservationError::NotAuthorized { reason: DenyReason::NotHeld }));
        assert_eq!(seat(&engine, 1).await.reservation, Reservation::Free);
    }

    #[tokio::test]
    async fn stale_seat_snapshot_is_not_trusted() {
        let engine = engine();
        // снимок сделан, пока место было свободно
        let stale = seat(&engine, 1).await;
        engine.reserve(&stale, &phone("555-0001")).await.unwrap();

        let err = engine.reserve(&stale, &phone("555-0002")).await.unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyReserved));
    }

    #[tokio::test]
    async fn addressing_errors_pass_through() {
        let engine = engine();
        let err = engine
            .reserve_at(CinemaId(1), HallId(1), SeatLocator::Id(SeatId(500)), &phone("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound(NotFoundKind::Seat(_))));

        let err = engine
            .release_at(CinemaId(3), HallId(1), SeatLocator::Id(SeatId(1)), &phone("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::NotFound(NotFoundKind::Cinema(CinemaId(3)))));
    }

    #[tokio::test]
    async fn unknown_seat_handle_is_not_found() {
        let engine = engine();
        let ghost = Seat::free(SeatId(777), HallId(1), 1, 1);
        let err = engine.reserve(&ghost, &phone("1")).await.unwrap_err();
        assert!(matches!(err, ReservationError::NotFound(NotFoundKind::Seat(_))));
        assert!(!matches!(
            ReservationError::from(StoreError::Corrupt("x".into())),
            ReservationError::NotFound(_)
        ));
    }
}
