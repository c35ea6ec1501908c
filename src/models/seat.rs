use serde::{Deserialize, Serialize};
use std::fmt;

use super::{HallId, Phone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(pub i64);

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Плоский статус места, как он лежит в колонке `seats.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Free,
    Held,
}

impl SeatStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SeatStatus::Free => "FREE",
            SeatStatus::Held => "HELD",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FREE" => Some(SeatStatus::Free),
            "HELD" => Some(SeatStatus::Held),
            _ => None,
        }
    }
}

/// Состояние брони места. Держатель есть только у `Held`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Reservation {
    #[default]
    Free,
    Held(Phone),
}

impl Reservation {
    pub fn status(&self) -> SeatStatus {
        match self {
            Reservation::Free => SeatStatus::Free,
            Reservation::Held(_) => SeatStatus::Held,
        }
    }

    pub fn holder(&self) -> Option<&Phone> {
        match self {
            Reservation::Free => None,
            Reservation::Held(phone) => Some(phone),
        }
    }

    pub fn is_held_by(&self, phone: &Phone) -> bool {
        self.holder() == Some(phone)
    }
}

/// Как клиент адресует место внутри зала.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeatLocator {
    Id(SeatId),
    Position { row: i32, place: i32 },
}

impl fmt::Display for SeatLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatLocator::Id(id) => write!(f, "seat #{}", id),
            SeatLocator::Position { row, place } => write!(f, "row {} place {}", row, place),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SeatRecord", try_from = "SeatRecord")]
pub struct Seat {
    pub id: SeatId,
    pub hall_id: HallId,
    pub row: i32,
    pub place: i32,
    pub reservation: Reservation,
}

impl Seat {
    pub fn free(id: SeatId, hall_id: HallId, row: i32, place: i32) -> Self {
        Seat { id, hall_id, row, place, reservation: Reservation::Free }
    }

    pub fn status(&self) -> SeatStatus {
        self.reservation.status()
    }

    pub fn holder(&self) -> Option<&Phone> {
        self.reservation.holder()
    }
}

/// Плоское представление места: JSON ответы, кеш и строки таблицы `seats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatRecord {
    pub id: SeatId,
    pub hall_id: HallId,
    pub row: i32,
    pub place: i32,
    pub status: SeatStatus,
    pub holder_phone: Option<Phone>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatRecordError {
    #[error("seat {0} is HELD but has no holder")]
    HeldWithoutHolder(SeatId),
    #[error("seat {0} is FREE but has a holder")]
    FreeWithHolder(SeatId),
}

impl TryFrom<SeatRecord> for Seat {
    type Error = SeatRecordError;

    fn try_from(record: SeatRecord) -> Result<Self, Self::Error> {
        let reservation = match (record.status, record.holder_phone) {
            (SeatStatus::Free, None) => Reservation::Free,
            (SeatStatus::Held, Some(phone)) => Reservation::Held(phone),
            (SeatStatus::Held, None) => return Err(SeatRecordError::HeldWithoutHolder(record.id)),
            (SeatStatus::Free, Some(_)) => return Err(SeatRecordError::FreeWithHolder(record.id)),
        };
        Ok(Seat {
            id: record.id,
            hall_id: record.hall_id,
            row: record.row,
            place: record.place,
            reservation,
        })
    }
}

impl From<Seat> for SeatRecord {
    fn from(seat: Seat) -> Self {
        SeatRecord {
            id: seat.id,
            hall_id: seat.hall_id,
            row: seat.row,
            place: seat.place,
            status: seat.reservation.status(),
            holder_phone: seat.reservation.holder().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone(s: &str) -> Phone {
        Phone::parse(s).unwrap()
    }

    #[test]
    fn json_shape_is_flat() {
        let mut seat = Seat::free(SeatId(2), HallId(1), 5, 10);
        seat.reservation = Reservation::Held(phone("89241278006"));
        let value = serde_json::to_value(&seat).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 2,
                "hall_id": 1,
                "row": 5,
                "place": 10,
                "status": "HELD",
                "holder_phone": "89241278006"
            })
        );
        let back: Seat = serde_json::from_value(value).unwrap();
        assert_eq!(back, seat);
    }

    #[test]
    fn record_rejects_broken_holder_invariant() {
        let json = serde_json::json!({
            "id": 1, "hall_id": 1, "row": 1, "place": 1,
            "status": "HELD", "holder_phone": null
        });
        assert!(serde_json::from_value::<Seat>(json).is_err());

        let json = serde_json::json!({
            "id": 1, "hall_id": 1, "row": 1, "place": 1,
            "status": "FREE", "holder_phone": "555"
        });
        assert!(serde_json::from_value::<Seat>(json).is_err());
    }

    #[test]
    fn locator_display() {
        assert_eq!(SeatLocator::Id(SeatId(7)).to_string(), "seat #7");
        assert_eq!(SeatLocator::Position { row: 3, place: 4 }.to_string(), "row 3 place 4");
    }

    #[test]
    fn free_seat_has_no_holder() {
        let seat = Seat::free(SeatId(1), HallId(1), 1, 1);
        assert_eq!(seat.status(), SeatStatus::Free);
        assert!(seat.holder().is_none());
        assert!(!seat.reservation.is_held_by(&phone("1")));
    }
}
