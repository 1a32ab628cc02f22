//! Simulated payment gateway
//!
//! Approves a configurable share of charges and hands out `TXN_…`
//! identifiers. The randomness source is owned by the instance so tests can
//! seed it or pin the probability to 0 or 1.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{PaymentError, PaymentProcessor, PaymentReceipt};

pub const DEFAULT_SUCCESS_PROBABILITY: f64 = 0.95;

pub struct SimulatedPaymentProcessor {
    success_probability: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedPaymentProcessor {
    /// `success_probability` is clamped to `[0, 1]`.
    pub fn new(success_probability: f64) -> Self {
        Self::with_rng(success_probability, StdRng::from_entropy())
    }

    /// Deterministic outcomes for a given seed
    pub fn seeded(success_probability: f64, seed: u64) -> Self {
        Self::with_rng(success_probability, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(success_probability: f64, rng: StdRng) -> Self {
        let success_probability = if success_probability.is_nan() {
            0.0
        } else {
            success_probability.clamp(0.0, 1.0)
        };
        Self {
            success_probability,
            rng: Mutex::new(rng),
        }
    }

    /// Always approves
    pub fn always_approve() -> Self {
        Self::new(1.0)
    }

    /// Always declines
    pub fn always_decline() -> Self {
        Self::new(0.0)
    }

    pub fn success_probability(&self) -> f64 {
        self.success_probability
    }
}

impl Default for SimulatedPaymentProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_SUCCESS_PROBABILITY)
    }
}

fn generate_transaction_id() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("TXN_{}", raw[..16].to_uppercase())
}

#[async_trait]
impl PaymentProcessor for SimulatedPaymentProcessor {
    async fn process(&self, amount: Decimal) -> Result<PaymentReceipt, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount(amount));
        }

        let approved = self.rng.lock().await.gen_bool(self.success_probability);
        if !approved {
            debug!(%amount, "Simulated payment declined");
            return Err(PaymentError::Declined(
                "Payment failed - Please try again".to_string(),
            ));
        }

        let transaction_id = generate_transaction_id();
        info!(%amount, transaction_id = %transaction_id, "Simulated payment captured");
        Ok(PaymentReceipt {
            transaction_id,
            message: "Payment successful".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let p = SimulatedPaymentProcessor::always_approve();
        assert_eq!(
            p.process(Decimal::ZERO).await,
            Err(PaymentError::InvalidAmount(Decimal::ZERO))
        );
        assert!(matches!(
            p.process(Decimal::from(-3)).await,
            Err(PaymentError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn forced_success_returns_unique_ids() {
        let p = SimulatedPaymentProcessor::always_approve();
        let a = p.process(Decimal::from(4)).await.unwrap();
        let b = p.process(Decimal::from(4)).await.unwrap();

        assert!(a.transaction_id.starts_with("TXN_"));
        assert_eq!(a.transaction_id.len(), 20);
        assert_eq!(a.transaction_id, a.transaction_id.to_uppercase());
        assert_ne!(a.transaction_id, b.transaction_id);
    }

    #[tokio::test]
    async fn forced_failure_declines() {
        let p = SimulatedPaymentProcessor::always_decline();
        assert!(matches!(
            p.process(Decimal::from(4)).await,
            Err(PaymentError::Declined(_))
        ));
    }

    #[tokio::test]
    async fn same_seed_same_outcomes() {
        let a = SimulatedPaymentProcessor::seeded(0.5, 42);
        let b = SimulatedPaymentProcessor::seeded(0.5, 42);
        for _ in 0..20 {
            let ra = a.process(Decimal::ONE).await.is_ok();
            let rb = b.process(Decimal::ONE).await.is_ok();
            assert_eq!(ra, rb);
        }
    }

    #[test]
    fn probability_is_clamped() {
        assert_eq!(SimulatedPaymentProcessor::new(3.0).success_probability(), 1.0);
        assert_eq!(SimulatedPaymentProcessor::new(-1.0).success_probability(), 0.0);
        assert_eq!(SimulatedPaymentProcessor::new(f64::NAN).success_probability(), 0.0);
    }
}
