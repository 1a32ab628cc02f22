//! # Parking Engine
//!
//! Slot reservation and booking lifecycle engine for parking facilities.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Slots, bookings, users, pricing, and the repository and
//!   payment traits
//! - **application**: The booking engine and slot administration services
//! - **infrastructure**: In-memory and SeaORM stores, simulated payment gateway
//! - **runtime**: Engine bootstrap, tracing and metrics setup
//! - **config**: TOML configuration

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod runtime;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

pub use application::{BookingService, BookingSettings, ReserveRequest, SlotMaintenanceService};
pub use runtime::{Engine, EngineOptions, StoreKind};
