pub mod dto;
pub mod services;

// Re-export key types for convenience
pub use dto::{CheckoutSummary, PaymentConfirmation, PaymentDetails, ReserveRequest};
pub use services::{BookingService, BookingSettings, SlotMaintenanceService};
