use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::catalog::{group_reservations, CatalogProjection, CinemaReservations};
use crate::error::ApiError;
use crate::models::{CinemaId, HallId, Phone, Seat, SeatId, SeatLocator};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/cinemas/{cinema_id}/halls/{hall_id}/seats/{seat_id}/reserve",
            post(reserve_by_id),
        )
        .route(
            "/cinemas/{cinema_id}/halls/{hall_id}/seats/{seat_id}/release",
            post(release_by_id),
        )
        .route(
            "/cinemas/{cinema_id}/halls/{hall_id}/rows/{row}/places/{place}/reserve",
            post(reserve_by_position),
        )
        .route(
            "/cinemas/{cinema_id}/halls/{hall_id}/rows/{row}/places/{place}/release",
            post(release_by_position),
        )
        .route("/reservations/{phone}", get(holder_reservations))
}

/* ---------- requests / responses ---------- */

#[derive(Debug, Deserialize, Validate)]
pub struct PhoneRequest {
    #[validate(length(min = 1, max = 32))]
    pub phone: String,
}

impl PhoneRequest {
    fn into_phone(self) -> Result<Phone, ApiError> {
        self.validate()?;
        Ok(Phone::parse(&self.phone)?)
    }
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub message: &'static str,
    pub seat: Seat,
}

#[derive(Debug, Deserialize)]
pub struct HolderQuery {
    pub cinema_id: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Reserve,
    Release,
}

/* ---------- helpers ---------- */

async fn transition(
    state: &AppState,
    cinema_id: CinemaId,
    hall_id: HallId,
    locator: SeatLocator,
    phone: Phone,
    action: Action,
) -> Result<Json<TransitionResponse>, ApiError> {
    let seat = state.store().resolve_seat(cinema_id, hall_id, locator).await?;

    let (seat, message) = match action {
        Action::Reserve => (state.engine.reserve(&seat, &phone).await?, "Место успешно забронировано"),
        Action::Release => (state.engine.release(&seat, &phone).await?, "Бронь успешно снята"),
    };

    // схема зала изменилась
    if let Some(cache) = &state.cache {
        cache.invalidate_hall(cinema_id, hall_id).await;
    }

    Ok(Json(TransitionResponse { message, seat }))
}

/* ---------- BY SEAT ID ---------- */

// POST /api/cinemas/{cinema_id}/halls/{hall_id}/seats/{seat_id}/reserve
async fn reserve_by_id(
    State(state): State<Arc<AppState>>,
    ApiPath((cinema_id, hall_id, seat_id)): ApiPath<(i64, i64, i64)>,
    ApiJson(req): ApiJson<PhoneRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let locator = SeatLocator::Id(SeatId(seat_id));
    let phone = req.into_phone()?;
    transition(&state, CinemaId(cinema_id), HallId(hall_id), locator, phone, Action::Reserve).await
}

// POST /api/cinemas/{cinema_id}/halls/{hall_id}/seats/{seat_id}/release
async fn release_by_id(
    State(state): State<Arc<AppState>>,
    ApiPath((cinema_id, hall_id, seat_id)): ApiPath<(i64, i64, i64)>,
    ApiJson(req): ApiJson<PhoneRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let locator = SeatLocator::Id(SeatId(seat_id));
    let phone = req.into_phone()?;
    transition(&state, CinemaId(cinema_id), HallId(hall_id), locator, phone, Action::Release).await
}

/* ---------- BY ROW / PLACE ---------- */

// POST /api/cinemas/{cinema_id}/halls/{hall_id}/rows/{row}/places/{place}/reserve
async fn reserve_by_position(
    State(state): State<Arc<AppState>>,
    ApiPath((cinema_id, hall_id, row, place)): ApiPath<(i64, i64, i32, i32)>,
    ApiJson(req): ApiJson<PhoneRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let locator = SeatLocator::Position { row, place };
    let phone = req.into_phone()?;
    transition(&state, CinemaId(cinema_id), HallId(hall_id), locator, phone, Action::Reserve).await
}

// POST /api/cinemas/{cinema_id}/halls/{hall_id}/rows/{row}/places/{place}/release
async fn release_by_position(
    State(state): State<Arc<AppState>>,
    ApiPath((cinema_id, hall_id, row, place)): ApiPath<(i64, i64, i32, i32)>,
    ApiJson(req): ApiJson<PhoneRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let locator = SeatLocator::Position { row, place };
    let phone = req.into_phone()?;
    transition(&state, CinemaId(cinema_id), HallId(hall_id), locator, phone, Action::Release).await
}

/* ---------- HOLDER ---------- */

// GET /api/reservations/{phone}?cinema_id=
async fn holder_reservations(
    State(state): State<Arc<AppState>>,
    ApiPath(phone): ApiPath<String>,
    ApiQuery(params): ApiQuery<HolderQuery>,
) -> Result<Json<Vec<CinemaReservations>>, ApiError> {
    let phone = Phone::parse(&phone)?;
    let seats = state
        .engine
        .holder_reservations(&phone, params.cinema_id.map(CinemaId))
        .await?;
    let cinemas = state.store().cinemas().await?;
    Ok(Json(group_reservations(&cinemas, seats)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_request_is_validated() {
        let req = PhoneRequest { phone: String::new() };
        assert!(matches!(req.into_phone(), Err(ApiError::Validation(_))));

        let req = PhoneRequest { phone: "call me".to_string() };
        assert!(matches!(req.into_phone(), Err(ApiError::InvalidPhone(_))));

        let req = PhoneRequest { phone: "555-0001".to_string() };
        assert_eq!(req.into_phone().unwrap().as_str(), "555-0001");
    }
}
