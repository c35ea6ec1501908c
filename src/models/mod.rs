pub mod cinema;
pub mod phone;
pub mod seat;

pub use cinema::{Cinema, CinemaId, Hall, HallId};
pub use phone::{Phone, PhoneError};
pub use seat::{Reservation, Seat, SeatId, SeatLocator, SeatStatus};
