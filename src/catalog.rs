//! Каталог только для чтения: кинотеатр -> зал -> место.

use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;

use crate::error::StoreError;
use crate::models::{Cinema, CinemaId, Hall, HallId, Seat, SeatLocator};
use crate::store::SeatStore;

pub trait CatalogProjection: SeatStore {
    /// Все кинотеатры вместе с залами, по id.
    fn cinemas(&self) -> impl Future<Output = Result<Vec<Cinema>, StoreError>> + Send;

    fn halls(&self, cinema_id: CinemaId) -> impl Future<Output = Result<Vec<Hall>, StoreError>> + Send;

    /// Места зала в порядке (ряд, место).
    fn seats(
        &self,
        cinema_id: CinemaId,
        hall_id: HallId,
    ) -> impl Future<Output = Result<Vec<Seat>, StoreError>> + Send;

    /// Превращает (кинотеатр, зал, локатор) в конкретное место.
    fn resolve_seat(
        &self,
        cinema_id: CinemaId,
        hall_id: HallId,
        locator: SeatLocator,
    ) -> impl Future<Output = Result<Seat, StoreError>> + Send {
        self.find_seat(cinema_id, hall_id, locator)
    }
}

/// Брони одного телефона, сгруппированные для показа.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CinemaReservations {
    pub id: CinemaId,
    pub name: String,
    pub address: String,
    pub halls: Vec<HallReservations>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HallReservations {
    pub id: HallId,
    pub number: i32,
    pub seats: Vec<Seat>,
}

/// Раскладывает места по кинотеатрам и залам. Пустые залы и кинотеатры
/// отбрасываются, места без зала в каталоге тоже.
pub fn group_reservations(cinemas: &[Cinema], seats: Vec<Seat>) -> Vec<CinemaReservations> {
    let mut by_hall: BTreeMap<HallId, Vec<Seat>> = BTreeMap::new();
    for seat in seats {
        by_hall.entry(seat.hall_id).or_default().push(seat);
    }

    cinemas
        .iter()
        .filter_map(|cinema| {
            let halls: Vec<HallReservations> = cinema
                .halls
                .iter()
                .filter_map(|hall| {
                    by_hall.remove(&hall.id).map(|seats| HallReservations {
                        id: hall.id,
                        number: hall.number,
                        seats,
                    })
                })
                .collect();
            if halls.is_empty() {
                None
            } else {
                Some(CinemaReservations {
                    id: cinema.id,
                    name: cinema.name.clone(),
                    address: cinema.address.clone(),
                    halls,
                })
            }
        })
        .collect()
}
