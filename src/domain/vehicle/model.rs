//! Vehicle domain entity

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::errors::DomainError;

/// Vehicle category a booking is made for and a slot is designated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VehicleType {
    Car,
    Bike,
    Truck,
    Ev,
}

impl Default for VehicleType {
    fn default() -> Self {
        Self::Car
    }
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "CAR",
            Self::Bike => "BIKE",
            Self::Truck => "TRUCK",
            Self::Ev => "EV",
        }
    }

    /// Case-insensitive comparison against a free-text slot designation.
    pub fn matches(&self, designation: &str) -> bool {
        designation.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CAR" => Ok(Self::Car),
            "BIKE" => Ok(Self::Bike),
            "TRUCK" => Ok(Self::Truck),
            "EV" => Ok(Self::Ev),
            other => Err(DomainError::InvalidInput(format!(
                "unknown vehicle type '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A vehicle registered by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub user_id: i64,
    pub vehicle_type: VehicleType,
    pub plate: Option<String>,
    /// Used when a booking names a type the user has no vehicle for
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Pick the vehicle type a booking is actually made with.
///
/// Precedence:
/// 1. registered vehicles exist: `requested` if one of them has that type,
///    otherwise the default vehicle, otherwise the first registered one;
/// 2. no registered vehicles: the profile type, then `requested`;
/// 3. `system_default`.
///
/// Callers without a user context pass an empty slice and `None` profile.
pub fn resolve_vehicle_type(
    requested: Option<VehicleType>,
    registered: &[Vehicle],
    profile_type: Option<VehicleType>,
    system_default: VehicleType,
) -> VehicleType {
    if !registered.is_empty() {
        if let Some(req) = requested {
            if registered.iter().any(|v| v.vehicle_type == req) {
                return req;
            }
        }
        return registered
            .iter()
            .find(|v| v.is_default)
            .unwrap_or(&registered[0])
            .vehicle_type;
    }

    profile_type.or(requested).unwrap_or(system_default)
}

// ── Tests ──────────────────────────────────────────────────────
