//! Time-based fee calculation
//!
//! Billing is per started hour: any part of an hour is charged as a full
//! one, with a minimum of one billed hour.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::model::PricingTable;
use crate::domain::vehicle::VehicleType;

const SECONDS_PER_BILLING_UNIT: i64 = 3600;

/// Result of a fee calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeQuote {
    /// Whole elapsed minutes
    pub duration_minutes: i64,
    pub billed_hours: i64,
    /// Hourly rate applied
    pub rate: Decimal,
    pub fee: Decimal,
}

/// Stateless fee calculator over a fixed rate table
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    pricing: PricingTable,
}

impl FeeCalculator {
    pub fn new(pricing: PricingTable) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn rate_for(&self, location_id: Option<i64>, vehicle_type: Option<VehicleType>) -> Decimal {
        self.pricing.rate_for(location_id, vehicle_type)
    }

    /// Calculate the fee for a stay.
    ///
    /// An `exit` before `entry` is treated as a zero-length stay.
    pub fn calculate_fee(
        &self,
        entry: DateTime<Utc>,
        exit: DateTime<Utc>,
        vehicle_type: Option<VehicleType>,
        location_id: Option<i64>,
    ) -> FeeQuote {
        let seconds = (exit - entry).num_seconds().max(0);
        let billed_hours = billed_units(seconds);
        let rate = self.rate_for(location_id, vehicle_type);

        FeeQuote {
            duration_minutes: seconds / 60,
            billed_hours,
            rate,
            fee: rate * Decimal::from(billed_hours),
        }
    }
}

fn billed_units(seconds: i64) -> i64 {
    let units = (seconds + SECONDS_PER_BILLING_UNIT - 1) / SECONDS_PER_BILLING_UNIT;
    units.max(1)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ten_am() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn calc() -> FeeCalculator {
        FeeCalculator::new(
            PricingTable::new(Decimal::from(2))
                .with_vehicle_rate(VehicleType::Bike, Decimal::new(150, 2))
                .with_location_rate(3, VehicleType::Car, Decimal::from(3)),
        )
    }

    #[test]
    fn ninety_minutes_bills_two_hours() {
        let q = calc().calculate_fee(
            ten_am(),
            ten_am() + Duration::minutes(90),
            Some(VehicleType::Car),
            None,
        );
        assert_eq!(q.duration_minutes, 90);
        assert_eq!(q.billed_hours, 2);
        assert_eq!(q.rate, Decimal::from(2));
        assert_eq!(q.fee, Decimal::from(4));
    }

    #[test]
    fn one_minute_bills_a_full_hour() {
        let q = calc().calculate_fee(
            ten_am(),
            ten_am() + Duration::minutes(1),
            Some(VehicleType::Car),
            None,
        );
        assert_eq!(q.billed_hours, 1);
        assert_eq!(q.fee, Decimal::from(2));
    }

    #[test]
    fn exact_hours_are_not_rounded_up() {
        let q = calc().calculate_fee(ten_am(), ten_am() + Duration::hours(3), None, None);
        assert_eq!(q.billed_hours, 3);
        assert_eq!(q.fee, Decimal::from(6));
    }

    #[test]
    fn zero_and_negative_stays_bill_minimum() {
        let c = calc();
        assert_eq!(c.calculate_fee(ten_am(), ten_am(), None, None).billed_hours, 1);
        let q = c.calculate_fee(ten_am(), ten_am() - Duration::hours(2), None, None);
        assert_eq!(q.duration_minutes, 0);
        assert_eq!(q.billed_hours, 1);
    }

    #[test]
    fn rate_depends_on_location_and_type() {
        let c = calc();
        let exit = ten_am() + Duration::minutes(61);
        assert_eq!(
            c.calculate_fee(ten_am(), exit, Some(VehicleType::Car), Some(3)).fee,
            Decimal::from(6)
        );
        assert_eq!(
            c.calculate_fee(ten_am(), exit, Some(VehicleType::Bike), Some(3)).fee,
            Decimal::from(3)
        );
    }

    #[test]
    fn identical_inputs_give_identical_quotes() {
        let c = calc();
        let exit = ten_am() + Duration::minutes(137);
        let a = c.calculate_fee(ten_am(), exit, Some(VehicleType::Ev), Some(9));
        let b = c.calculate_fee(ten_am(), exit, Some(VehicleType::Ev), Some(9));
        assert_eq!(a, b);
    }
}
