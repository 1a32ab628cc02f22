//! Vehicle types and effective-type resolution

pub mod model;

pub use model::{resolve_vehicle_type, Vehicle, VehicleType};
