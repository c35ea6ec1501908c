use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::catalog::CatalogProjection;
use crate::error::{NotFoundKind, StoreError};
use crate::models::{Cinema, CinemaId, Hall, HallId, Phone, Reservation, Seat, SeatId, SeatLocator};
use crate::seed::{SeedData, SeedError};

use super::{SeatStore, Transition};

/// Хранилище в памяти процесса.
///
/// Структура каталога неизменна после сида, поэтому общей блокировки нет:
/// у каждого места свой мьютекс на `Reservation`, и compare-and-transition
/// выполняется целиком под ним.
#[derive(Clone)]
pub struct InMemorySeatStore {
    inner: Arc<Inner>,
}

struct Inner {
    cinemas: Vec<Cinema>,
    // места зала в порядке (row, place)
    hall_seats: HashMap<HallId, Vec<SeatId>>,
    seats: HashMap<SeatId, SeatSlot>,
}

struct SeatSlot {
    hall_id: HallId,
    row: i32,
    place: i32,
    reservation: Mutex<Reservation>,
}

impl SeatSlot {
    // Отравленный мьютекс не мешает: Reservation всегда целостна.
    fn lock(&self) -> MutexGuard<'_, Reservation> {
        self.reservation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, id: SeatId) -> Seat {
        Seat {
            id,
            hall_id: self.hall_id,
            row: self.row,
            place: self.place,
            reservation: self.lock().clone(),
        }
    }
}

impl InMemorySeatStore {
    pub fn from_seed(seed: &SeedData) -> Result<Self, SeedError> {
        seed.validate()?;

        let mut cinemas = Vec::with_capacity(seed.cinemas.len());
        let mut hall_seats = HashMap::new();
        let mut seats = HashMap::new();

        for sc in &seed.cinemas {
            let mut halls = Vec::with_capacity(sc.halls.len());
            for sh in &sc.halls {
                halls.push(Hall { id: sh.id, number: sh.number, cinema_id: sc.id });

                let mut ordered: Vec<_> = sh.seats.iter().collect();
                ordered.sort_by_key(|s| (s.row, s.place));
                hall_seats.insert(sh.id, ordered.iter().map(|s| s.id).collect());

                for ss in ordered {
                    let reservation = match &ss.holder_phone {
                        Some(phone) => Reservation::Held(phone.clone()),
                        None => Reservation::Free,
                    };
                    seats.insert(
                        ss.id,
                        SeatSlot {
                            hall_id: sh.id,
                            row: ss.row,
                            place: ss.place,
                            reservation: Mutex::new(reservation),
                        },
                    );
                }
            }
            halls.sort_by_key(|h| h.id);
            cinemas.push(Cinema {
                id: sc.id,
                name: sc.name.clone(),
                address: sc.address.clone(),
                halls,
            });
        }
        cinemas.sort_by_key(|c| c.id);

        Ok(InMemorySeatStore { inner: Arc::new(Inner { cinemas, hall_seats, seats }) })
    }

    fn cinema(&self, cinema_id: CinemaId) -> Result<&Cinema, StoreError> {
        self.inner
            .cinemas
            .iter()
            .find(|c| c.id == cinema_id)
            .ok_or(StoreError::NotFound(NotFoundKind::Cinema(cinema_id)))
    }

    fn hall_seat_ids(&self, cinema_id: CinemaId, hall_id: HallId) -> Result<&[SeatId], StoreError> {
        let cinema = self.cinema(cinema_id)?;
        if !cinema.halls.iter().any(|h| h.id == hall_id) {
            return Err(StoreError::NotFound(NotFoundKind::Hall(cinema_id, hall_id)));
        }
        Ok(self.inner.hall_seats.get(&hall_id).map(Vec::as_slice).unwrap_or_default())
    }

    fn snapshot_all(&self, ids: &[SeatId]) -> Vec<Seat> {
        ids.iter()
            .filter_map(|id| self.inner.seats.get(id).map(|slot| slot.snapshot(*id)))
            .collect()
    }
}

impl SeatStore for InMemorySeatStore {
    async fn find_seat(
        &self,
        cinema_id: CinemaId,
        hall_id: HallId,
        locator: SeatLocator,
    ) -> Result<Seat, StoreError> {
        let ids = self.hall_seat_ids(cinema_id, hall_id)?;
        ids.iter()
            .filter_map(|id| self.inner.seats.get(id).map(|slot| (id, slot)))
            .find(|(id, slot)| match locator {
                SeatLocator::Id(wanted) => **id == wanted,
                SeatLocator::Position { row, place } => slot.row == row && slot.place == place,
            })
            .map(|(id, slot)| slot.snapshot(*id))
            .ok_or(StoreError::NotFound(NotFoundKind::Seat(locator)))
    }

    async fn get_seat(&self, seat_id: SeatId) -> Result<Option<Seat>, StoreError> {
        Ok(self.inner.seats.get(&seat_id).map(|slot| slot.snapshot(seat_id)))
    }

    async fn compare_and_transition(
        &self,
        seat_id: SeatId,
        expected: &Reservation,
        next: Reservation,
    ) -> Result<Transition, StoreError> {
        let slot = self
            .inner
            .seats
            .get(&seat_id)
            .ok_or(StoreError::NotFound(NotFoundKind::Seat(SeatLocator::Id(seat_id))))?;

        let mut current = slot.lock();
        if *current != *expected {
            return Ok(Transition::Conflict);
        }
        *current = next;
        let seat = Seat {
            id: seat_id,
            hall_id: slot.hall_id,
            row: slot.row,
            place: slot.place,
            reservation: current.clone(),
        };
        Ok(Transition::Applied(seat))
    }

    async fn seats_held_by(
        &self,
        holder: &Phone,
        cinema_id: Option<CinemaId>,
    ) -> Result<Vec<Seat>, StoreError> {
        let mut held = Vec::new();
        for cinema in &self.inner.cinemas {
            if cinema_id.is_some_and(|id| id != cinema.id) {
                continue;
            }
            for hall in &cinema.halls {
                let Some(ids) = self.inner.hall_seats.get(&hall.id) else {
                    continue;
                };
                held.extend(
                    self.snapshot_all(ids)
                        .into_iter()
                        .filter(|seat| seat.reservation.is_held_by(holder)),
                );
            }
        }
        Ok(held)
    }
}

impl CatalogProjection for InMemorySeatStore {
    async fn cinemas(&self) -> Result<Vec<Cinema>, StoreError> {
        Ok(self.inner.cinemas.clone())
    }

    async fn halls(&self, cinema_id: CinemaId) -> Result<Vec<Hall>, StoreError> {
        Ok(self.cinema(cinema_id)?.halls.clone())
    }

    async fn seats(&self, cinema_id: CinemaId, hall_id: HallId) -> Result<Vec<Seat>, StoreError> {
        let ids = self.hall_seat_ids(cinema_id, hall_id)?;
        Ok(self.snapshot_all(ids))
    }
}
