//! Reservation engine against the in-memory store: the reference scenario,
//! racing callers and addressing-mode equivalence.

use std::sync::Arc;

use cinema_reservation::error::{DenyReason, NotFoundKind, ReservationError};
use cinema_reservation::models::{
    CinemaId, HallId, Phone, Reservation, Seat, SeatId, SeatLocator, SeatStatus,
};
use cinema_reservation::reservation::ReservationEngine;
use cinema_reservation::seed::{SeedCinema, SeedData, SeedHall, SeedSeat};
use cinema_reservation::store::{InMemorySeatStore, SeatStore};
use tokio::sync::Barrier;

fn phone(s: &str) -> Phone {
    Phone::parse(s).unwrap()
}

fn engine_with(seed: &SeedData) -> ReservationEngine<InMemorySeatStore> {
    ReservationEngine::new(InMemorySeatStore::from_seed(seed).unwrap())
}

/// One cinema, one hall, a single row of `places` free seats with ids 1..=places.
fn row_of_seats(places: i32) -> SeedData {
    SeedData {
        cinemas: vec![SeedCinema {
            id: CinemaId(1),
            name: "Row".to_string(),
            address: "Test".to_string(),
            halls: vec![SeedHall {
                id: HallId(1),
                number: 1,
                seats: (1..=places)
                    .map(|p| SeedSeat { id: SeatId(p as i64), row: 1, place: p, holder_phone: None })
                    .collect(),
            }],
        }],
    }
}

async fn current(engine: &ReservationEngine<InMemorySeatStore>, id: i64) -> Seat {
    engine.store().get_seat(SeatId(id)).await.unwrap().unwrap()
}

fn assert_holder_iff_held(seat: &Seat) {
    assert_eq!(seat.status() == SeatStatus::Held, seat.holder().is_some());
}

#[tokio::test]
async fn default_seed_scenario() {
    let engine = engine_with(&SeedData::default());
    let seat1 = engine
        .store()
        .find_seat(CinemaId(1), HallId(1), SeatLocator::Position { row: 5, place: 10 })
        .await
        .unwrap();
    let seat2 = engine
        .store()
        .find_seat(CinemaId(1), HallId(2), SeatLocator::Position { row: 5, place: 10 })
        .await
        .unwrap();
    assert_eq!(seat1.id, SeatId(1));
    assert_eq!(seat2.id, SeatId(2));

    let held = engine.reserve(&seat1, &phone("555-0001")).await.unwrap();
    assert_eq!(held.reservation, Reservation::Held(phone("555-0001")));

    let err = engine.reserve(&seat1, &phone("555-0002")).await.unwrap_err();
    assert!(matches!(err, ReservationError::AlreadyReserved));

    let err = engine.release(&seat2, &phone("555-0002")).await.unwrap_err();
    assert!(matches!(err, ReservationError::NotAuthorized { reason: DenyReason::HeldByOther }));

    let freed = engine.release(&seat2, &phone("89241278006")).await.unwrap();
    assert_eq!(freed.status(), SeatStatus::Free);
    assert!(freed.holder().is_none());

    for id in [1, 2, 3, 4] {
        assert_holder_iff_held(&current(&engine, id).await);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reserves_have_one_winner() {
    const CALLERS: usize = 64;
    let engine = Arc::new(engine_with(&row_of_seats(1)));
    let seat = current(&engine, 1).await;
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            let seat = seat.clone();
            tokio::spawn(async move {
                let holder = phone(&format!("555-{:04}", i));
                barrier.wait().await;
                (holder.clone(), engine.reserve(&seat, &holder).await)
            })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let winners: Vec<&Phone> = results
        .iter()
        .filter(|(_, r)| r.is_ok())
        .map(|(holder, _)| holder)
        .collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|(_, r)| matches!(r, Err(ReservationError::AlreadyReserved)))
            .count(),
        CALLERS - 1
    );

    let final_seat = current(&engine, 1).await;
    assert_eq!(final_seat.holder(), Some(winners[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_release_and_steal_never_frees_foreign_hold() {
    for _ in 0..50 {
        let engine = Arc::new(engine_with(&row_of_seats(1)));
        let seat = current(&engine, 1).await;
        let owner = phone("555-0001");
        engine.reserve(&seat, &owner).await.unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let release = {
            let (engine, barrier, seat, owner) =
                (engine.clone(), barrier.clone(), seat.clone(), owner.clone());
            tokio::spawn(async move {
                barrier.wait().await;
                engine.release(&seat, &owner).await
            })
        };
        let stranger = {
            let (engine, barrier, seat) = (engine.clone(), barrier.clone(), seat.clone());
            tokio::spawn(async move {
                barrier.wait().await;
                engine.release(&seat, &phone("555-0666")).await
            })
        };

        assert!(release.await.unwrap().is_ok());
        assert!(matches!(
            stranger.await.unwrap(),
            Err(ReservationError::NotAuthorized { .. })
        ));
        assert_eq!(current(&engine, 1).await.reservation, Reservation::Free);
    }
}

#[tokio::test]
async fn id_and_position_addressing_behave_identically() {
    let engine = engine_with(&row_of_seats(2));
    let by_id = SeatLocator::Id(SeatId(2));
    let by_position = SeatLocator::Position { row: 1, place: 2 };

    let a = engine.store().find_seat(CinemaId(1), HallId(1), by_id).await.unwrap();
    let b = engine.store().find_seat(CinemaId(1), HallId(1), by_position).await.unwrap();
    assert_eq!(a, b);

    let holder = phone("555-0001");
    let reserved = engine.reserve_at(CinemaId(1), HallId(1), by_id, &holder).await.unwrap();
    assert_eq!(reserved.id, SeatId(2));

    let err = engine.reserve_at(CinemaId(1), HallId(1), by_position, &holder).await.unwrap_err();
    assert!(matches!(err, ReservationError::AlreadyReserved));

    let err = engine
        .release_at(CinemaId(1), HallId(1), by_id, &phone("555-0002"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::NotAuthorized { reason: DenyReason::HeldByOther }));

    let freed = engine.release_at(CinemaId(1), HallId(1), by_position, &holder).await.unwrap();
    assert_eq!(freed.reservation, Reservation::Free);

    let err = engine.release_at(CinemaId(1), HallId(1), by_id, &holder).await.unwrap_err();
    assert!(matches!(err, ReservationError::NotAuthorized { reason: DenyReason::NotHeld }));
}

#[tokio::test]
async fn holder_reservations_list_exactly_held_seats() {
    let engine = engine_with(&row_of_seats(3));
    let holder = phone("555-0001");
    let (a, c) = (current(&engine, 1).await, current(&engine, 3).await);

    engine.reserve(&a, &holder).await.unwrap();
    engine.reserve(&c, &holder).await.unwrap();
    engine.reserve(&current(&engine, 2).await, &phone("555-0002")).await.unwrap();

    let held: Vec<SeatId> = engine
        .holder_reservations(&holder, None)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(held, vec![SeatId(1), SeatId(3)]);

    assert!(engine
        .holder_reservations(&holder, Some(CinemaId(9)))
        .await
        .unwrap()
        .is_empty());

    engine.release(&a, &holder).await.unwrap();
    let held = engine.holder_reservations(&holder, Some(CinemaId(1))).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].id, SeatId(3));
}

#[tokio::test]
async fn missing_cinema_hall_and_seat_are_distinct() {
    let engine = engine_with(&row_of_seats(1));
    let holder = phone("555-0001");
    let locator = SeatLocator::Id(SeatId(1));

    let err = engine.reserve_at(CinemaId(2), HallId(1), locator, &holder).await.unwrap_err();
    assert!(matches!(err, ReservationError::NotFound(NotFoundKind::Cinema(CinemaId(2)))));

    let err = engine.reserve_at(CinemaId(1), HallId(2), locator, &holder).await.unwrap_err();
    assert!(matches!(err, ReservationError::NotFound(NotFoundKind::Hall(CinemaId(1), HallId(2)))));

    let err = engine
        .reserve_at(CinemaId(1), HallId(1), SeatLocator::Position { row: 9, place: 9 }, &holder)
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::NotFound(NotFoundKind::Seat(_))));
}
