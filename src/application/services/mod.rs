//! Application services

mod booking;
mod maintenance;

pub use booking::{BookingService, BookingSettings};
pub use maintenance::SlotMaintenanceService;
