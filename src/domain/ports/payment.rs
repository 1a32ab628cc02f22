//! Outbound payment port
//!
//! The booking engine only talks to a gateway through [`PaymentProcessor`],
//! so the simulator can be swapped for a real client without touching it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Successful capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// The gateway refused the charge; safe to retry
    #[error("{0}")]
    Declined(String),
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Charge `amount`. Non-positive amounts are rejected without contacting
    /// the gateway.
    async fn process(&self, amount: Decimal) -> Result<PaymentReceipt, PaymentError>;
}
