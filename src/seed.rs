//! Начальные данные каталога: кинотеатры, залы, места.
//!
//! Загружаются один раз при старте процесса (встроенный набор или JSON файл
//! из `SEED_PATH`) и передаются хранилищу явно.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::models::{CinemaId, HallId, Phone, SeatId};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate cinema id {0}")]
    DuplicateCinema(CinemaId),

    #[error("duplicate hall id {0}")]
    DuplicateHall(HallId),

    #[error("duplicate seat id {0}")]
    DuplicateSeat(SeatId),

    #[error("hall {hall} has two seats at row {row} place {place}")]
    DuplicatePosition { hall: HallId, row: i32, place: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedData {
    pub cinemas: Vec<SeedCinema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCinema {
    pub id: CinemaId,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub halls: Vec<SeedHall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedHall {
    pub id: HallId,
    pub number: i32,
    #[serde(default)]
    pub seats: Vec<SeedSeat>,
}

/// Место в сиде. `holder_phone` задан - место уже занято.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSeat {
    pub id: SeatId,
    pub row: i32,
    pub place: i32,
    #[serde(default)]
    pub holder_phone: Option<Phone>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub cinemas: usize,
    pub halls: usize,
    pub seats: usize,
    pub held: usize,
}

impl SeedData {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        let seed: SeedData = serde_json::from_str(&raw)?;
        seed.validate()?;
        Ok(seed)
    }

    /// Проверяет уникальность id и позиций мест внутри зала.
    pub fn validate(&self) -> Result<(), SeedError> {
        let mut cinemas = HashSet::new();
        let mut halls = HashSet::new();
        let mut seats = HashSet::new();

        for cinema in &self.cinemas {
            if !cinemas.insert(cinema.id) {
                return Err(SeedError::DuplicateCinema(cinema.id));
            }
            for hall in &cinema.halls {
                if !halls.insert(hall.id) {
                    return Err(SeedError::DuplicateHall(hall.id));
                }
                let mut positions = HashSet::new();
                for seat in &hall.seats {
                    if !seats.insert(seat.id) {
                        return Err(SeedError::DuplicateSeat(seat.id));
                    }
                    if !positions.insert((seat.row, seat.place)) {
                        return Err(SeedError::DuplicatePosition {
                            hall: hall.id,
                            row: seat.row,
                            place: seat.place,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> SeedSummary {
        let mut summary = SeedSummary { cinemas: self.cinemas.len(), ..Default::default() };
        for hall in self.cinemas.iter().flat_map(|c| c.halls.iter()) {
            summary.halls += 1;
            summary.seats += hall.seats.len();
            summary.held += hall.seats.iter().filter(|s| s.holder_phone.is_some()).count();
        }
        summary
    }
}

impl Default for SeedData {
    /// Один кинотеатр, два зала: свободное место 5/10 в восьмом зале и
    /// занятое 5/10 в девятом.
    fn default() -> Self {
        let held_by = Phone::parse("89241278006").ok();
        SeedData {
            cinemas: vec![SeedCinema {
                id: CinemaId(1),
                name: "CinemaPark".to_string(),
                address: "Садовая 12".to_string(),
                halls: vec![
                    SeedHall {
                        id: HallId(1),
                        number: 8,
                        seats: vec![
                            SeedSeat { id: SeatId(1), row: 5, place: 10, holder_phone: None },
                            SeedSeat { id: SeatId(3), row: 5, place: 11, holder_phone: None },
                            SeedSeat { id: SeatId(4), row: 6, place: 10, holder_phone: None },
                        ],
                    },
                    SeedHall {
                        id: HallId(2),
                        number: 9,
                        seats: vec![SeedSeat {
                            id: SeatId(2),
                            row: 5,
                            place: 10,
                            holder_phone: held_by,
                        }],
                    },
                ],
            }],
        }
    }
}
