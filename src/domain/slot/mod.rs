//! Slot aggregate
//!
//! Contains the Slot entity and its repository interface.

pub mod model;
pub mod repository;

pub use model::{NewSlot, Slot};
pub use repository::SlotRepository;
