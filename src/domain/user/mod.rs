//! User aggregate
//!
//! Users, their registered vehicles, and principal → user resolution.

pub mod model;
pub mod repository;

pub use model::{NewUser, NewVehicle, User};
pub use repository::UserRepository;
