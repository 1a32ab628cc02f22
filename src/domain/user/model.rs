//! User domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::vehicle::VehicleType;

/// Parking customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Authenticated principal name
    pub email: String,
    pub name: String,
    /// Vehicle type from the user profile, used when no vehicles are registered
    pub vehicle_type: Option<VehicleType>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub vehicle_type: Option<VehicleType>,
}

#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub user_id: i64,
    pub vehicle_type: VehicleType,
    pub plate: Option<String>,
    pub is_default: bool,
}
