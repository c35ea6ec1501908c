use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::{CinemaId, HallId, PhoneError, SeatLocator};

/// Какая часть адреса места не нашлась.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundKind {
    Cinema(CinemaId),
    Hall(CinemaId, HallId),
    Seat(SeatLocator),
}

impl std::fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFoundKind::Cinema(id) => write!(f, "cinema {} not found", id),
            NotFoundKind::Hall(cinema, hall) => {
                write!(f, "hall {} not found in cinema {}", hall, cinema)
            }
            NotFoundKind::Seat(locator) => write!(f, "{} not found", locator),
        }
    }
}

/// Ошибки хранилища мест.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(NotFoundKind),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt seat row: {0}")]
    Corrupt(String),
}

/// Почему освобождение места отклонено.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Место свободно, снимать нечего.
    NotHeld,
    /// Место держит другой телефон.
    HeldByOther,
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("{0}")]
    NotFound(NotFoundKind),

    #[error("seat already reserved")]
    AlreadyReserved,

    #[error("not authorized to release seat ({reason:?})")]
    NotAuthorized { reason: DenyReason },

    #[error("seat store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(kind) => ReservationError::NotFound(kind),
            other => ReservationError::StoreUnavailable(other),
        }
    }
}

/// Ошибка HTTP слоя, сама превращается в JSON ответ.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("bad request body: {0}")]
    Body(#[from] JsonRejection),

    #[error("bad path: {0}")]
    Path(#[from] PathRejection),

    #[error("bad query: {0}")]
    Query(#[from] QueryRejection),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Reservation(err.into())
    }
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Reservation(err) => match err {
                ReservationError::NotFound(NotFoundKind::Cinema(_)) => {
                    (StatusCode::NOT_FOUND, "CINEMA_NOT_FOUND")
                }
                ReservationError::NotFound(NotFoundKind::Hall(..)) => {
                    (StatusCode::NOT_FOUND, "HALL_NOT_FOUND")
                }
                ReservationError::NotFound(NotFoundKind::Seat(_)) => {
                    (StatusCode::NOT_FOUND, "SEAT_NOT_FOUND")
                }
                ReservationError::AlreadyReserved => (StatusCode::CONFLICT, "ALREADY_RESERVED"),
                ReservationError::NotAuthorized { reason: DenyReason::NotHeld } => {
                    (StatusCode::FORBIDDEN, "NOT_RESERVED")
                }
                ReservationError::NotAuthorized { reason: DenyReason::HeldByOther } => {
                    (StatusCode::FORBIDDEN, "NOT_AUTHORIZED")
                }
                ReservationError::StoreUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
                }
            },
            ApiError::InvalidPhone(_) => (StatusCode::BAD_REQUEST, "INVALID_PHONE"),
            // кривой JSON, путь или query - та же ошибка валидации
            ApiError::Validation(_) | ApiError::Body(_) | ApiError::Path(_) | ApiError::Query(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Reservation(ReservationError::NotFound(kind)) => match kind {
                NotFoundKind::Cinema(_) => "Кинотеатр не найден".to_string(),
                NotFoundKind::Hall(..) => "Зал не найден".to_string(),
                NotFoundKind::Seat(_) => "Место не существует".to_string(),
            },
            ApiError::Reservation(ReservationError::AlreadyReserved) => {
                "Место уже забронировано".to_string()
            }
            ApiError::Reservation(ReservationError::NotAuthorized { reason }) => match reason {
                DenyReason::NotHeld => "Место не забронировано".to_string(),
                DenyReason::HeldByOther => "Нет прав снять эту бронь".to_string(),
            },
            ApiError::Reservation(ReservationError::StoreUnavailable(_)) => {
                "Хранилище временно недоступно".to_string()
            }
            ApiError::InvalidPhone(e) => format!("Некорректный телефон: {}", e),
            ApiError::Validation(e) => format!("Некорректный запрос: {}", e),
            ApiError::Body(e) => format!("Некорректное тело запроса: {}", e.body_text()),
            ApiError::Path(e) => format!("Некорректный адрес: {}", e.body_text()),
            ApiError::Query(e) => format!("Некорректные параметры: {}", e.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if let ApiError::Reservation(ReservationError::StoreUnavailable(err)) = &self {
            tracing::error!(error = %err, "seat store unavailable");
        }
        let body = json!({
            "error": self.message(),
            "code": code,
        });
        (status, Json(body)).into_response()
    }
}

/// Ошибки запуска сервиса.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Seed(#[from] crate::seed::SeedError),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("seeding failed: {0}")]
    Store(#[from] StoreError),
}
