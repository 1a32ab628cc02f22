//! Parking pricing
//!
//! Rate tables and the pure fee calculator used at checkout.

pub mod calculator;
pub mod model;

pub use calculator::{FeeCalculator, FeeQuote};
pub use model::PricingTable;
