pub mod audit;
pub mod booking;
pub mod ports;
pub mod pricing;
pub mod repositories;
pub mod slot;
pub mod user;
pub mod vehicle;

// Re-export commonly used types
pub use audit::{AuditAction, AuditEntry, AuditRepository};
pub use booking::{Booking, BookingRepository, BookingStatus, BookingWindow, PaymentStatus};
pub use ports::{PaymentError, PaymentProcessor, PaymentReceipt};
pub use pricing::{FeeCalculator, FeeQuote, PricingTable};
pub use repositories::{DomainResult, RepositoryProvider, SlotTransaction};
pub use slot::{NewSlot, Slot, SlotRepository};
pub use user::{NewUser, NewVehicle, User, UserRepository};
pub use vehicle::{resolve_vehicle_type, Vehicle, VehicleType};

// Re-export DomainError from shared for convenience
pub use crate::shared::errors::DomainError;
