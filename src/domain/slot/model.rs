//! Slot domain entity

use serde::{Deserialize, Serialize};

use crate::domain::vehicle::VehicleType;

/// A physical parking slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: i64,
    /// Human-facing slot label (e.g. "A-12")
    pub number: String,
    /// False while an ACTIVE booking holds the slot
    pub available: bool,
    /// Taken out of service by maintenance; never reservable
    pub disabled: bool,
    pub maintenance_notes: Option<String>,
    /// Designated vehicle type as stored (free text, e.g. "CAR")
    pub slot_type: Option<String>,
    pub location_id: Option<i64>,
}

impl Slot {
    /// Slot type used for matching; an unassigned type counts as `fallback`.
    pub fn effective_type(&self, fallback: VehicleType) -> String {
        match self.slot_type.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => fallback.as_str().to_string(),
        }
    }

    /// Whether a booking for `vehicle_type` may use this slot.
    pub fn accepts(&self, vehicle_type: VehicleType, fallback: VehicleType) -> bool {
        vehicle_type.matches(&self.effective_type(fallback))
    }

    /// Available and not under maintenance
    pub fn is_reservable(&self) -> bool {
        self.available && !self.disabled
    }

    pub fn occupy(&mut self) {
        self.available = false;
    }

    pub fn release(&mut self) {
        self.available = true;
    }
}

/// Input for creating a slot
#[derive(Debug, Clone, Default)]
pub struct NewSlot {
    pub number: String,
    pub slot_type: Option<String>,
    pub location_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(slot_type: Option<&str>) -> Slot {
        Slot {
            id: 1,
            number: "A-1".into(),
            available: true,
            disabled: false,
            maintenance_notes: None,
            slot_type: slot_type.map(String::from),
            location_id: None,
        }
    }

    #[test]
    fn untyped_slot_counts_as_fallback() {
        let s = slot(None);
        assert!(s.accepts(VehicleType::Car, VehicleType::Car));
        assert!(!s.accepts(VehicleType::Bike, VehicleType::Car));

        let s = slot(Some("  "));
        assert_eq!(s.effective_type(VehicleType::Car), "CAR");
    }

    #[test]
    fn slot_type_matches_case_insensitively() {
        let s = slot(Some("ev"));
        assert!(s.accepts(VehicleType::Ev, VehicleType::Car));
        assert!(!s.accepts(VehicleType::Car, VehicleType::Car));
    }

    #[test]
    fn disabled_slot_is_not_reservable() {
        let mut s = slot(Some("CAR"));
        assert!(s.is_reservable());
        s.disabled = true;
        assert!(!s.is_reservable());
        s.disabled = false;
        s.occupy();
        assert!(!s.is_reservable());
        s.release();
        assert!(s.is_reservable());
    }
}
