//! Hourly rate table

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::vehicle::VehicleType;

/// Hourly parking rates with location- and type-specific overrides
#[derive(Debug, Clone, PartialEq)]
pub struct PricingTable {
    /// Flat rate when nothing more specific is configured
    pub default_rate: Decimal,
    vehicle_rates: HashMap<VehicleType, Decimal>,
    location_rates: HashMap<(i64, VehicleType), Decimal>,
}

impl PricingTable {
    pub fn new(default_rate: Decimal) -> Self {
        Self {
            default_rate,
            vehicle_rates: HashMap::new(),
            location_rates: HashMap::new(),
        }
    }

    pub fn with_vehicle_rate(mut self, vehicle_type: VehicleType, rate: Decimal) -> Self {
        self.vehicle_rates.insert(vehicle_type, rate);
        self
    }

    pub fn with_location_rate(
        mut self,
        location_id: i64,
        vehicle_type: VehicleType,
        rate: Decimal,
    ) -> Self {
        self.location_rates.insert((location_id, vehicle_type), rate);
        self
    }

    /// Hourly rate: location+type → type → flat default.
    pub fn rate_for(&self, location_id: Option<i64>, vehicle_type: Option<VehicleType>) -> Decimal {
        let Some(vehicle_type) = vehicle_type else {
            return self.default_rate;
        };

        location_id
            .and_then(|loc| self.location_rates.get(&(loc, vehicle_type)))
            .or_else(|| self.vehicle_rates.get(&vehicle_type))
            .copied()
            .unwrap_or(self.default_rate)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::new(Decimal::from(2))
    }
}
