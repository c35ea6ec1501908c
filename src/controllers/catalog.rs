use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::extract::ApiPath;
use crate::catalog::CatalogProjection;
use crate::error::ApiError;
use crate::models::{Cinema, CinemaId, Hall, HallId};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cinemas", get(list_cinemas))
        .route("/cinemas/{cinema_id}/halls", get(list_halls))
        .route("/cinemas/{cinema_id}/halls/{hall_id}/seats", get(list_seats))
}

// GET /api/cinemas
async fn list_cinemas(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Cinema>>, ApiError> {
    Ok(Json(state.store().cinemas().await?))
}

// GET /api/cinemas/{cinema_id}/halls
async fn list_halls(
    State(state): State<Arc<AppState>>,
    ApiPath(cinema_id): ApiPath<i64>,
) -> Result<Json<Vec<Hall>>, ApiError> {
    Ok(Json(state.store().halls(CinemaId(cinema_id)).await?))
}

// GET /api/cinemas/{cinema_id}/halls/{hall_id}/seats
async fn list_seats(
    State(state): State<Arc<AppState>>,
    ApiPath((cinema_id, hall_id)): ApiPath<(i64, i64)>,
) -> Result<Response, ApiError> {
    let (cinema_id, hall_id) = (CinemaId(cinema_id), HallId(hall_id));

    // 1. Пробуем кеш
    if let Some(cache) = &state.cache {
        if let Some(seats) = cache.get_hall_seats(cinema_id, hall_id).await {
            return Ok(([(header::HeaderName::from_static("x-cache"), "HIT")], Json(seats))
                .into_response());
        }
    }

    // 2. Промах: поколение берём до чтения хранилища, иначе инвалидация
    // между чтением и записью оставит в кеше старую схему
    let generation = match &state.cache {
        Some(cache) => cache.hall_generation(cinema_id, hall_id).await,
        None => None,
    };
    let seats = state.store().seats(cinema_id, hall_id).await?;
    if let (Some(cache), Some(generation)) = (&state.cache, generation) {
        cache.put_hall_seats(cinema_id, hall_id, generation, &seats).await;
    }

    Ok(([(header::HeaderName::from_static("x-cache"), "MISS")], Json(seats)).into_response())
}
