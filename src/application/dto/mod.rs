//! Request and result types of the booking engine

mod booking;

pub use booking::{CheckoutSummary, PaymentConfirmation, PaymentDetails, ReserveRequest};
