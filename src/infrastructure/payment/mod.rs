mod simulated;

pub use simulated::{SimulatedPaymentProcessor, DEFAULT_SUCCESS_PROBABILITY};
