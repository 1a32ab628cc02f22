//! Booking aggregate
//!
//! Contains the Booking entity, its lifecycle states, and repository interface.

pub mod model;
pub mod repository;

pub use model::{Booking, BookingStatus, BookingWindow, PaymentStatus};
pub use repository::BookingRepository;
