//! Configuration module
//!
//! Settings live in a TOML file, by default
//! `~/.config/parking-engine/config.toml`. Every field has a default, so a
//! missing file or a partial one is fine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::BookingSettings;
use crate::domain::{PricingTable, VehicleType};
use crate::infrastructure::DatabaseConfig;
use crate::infrastructure::payment::DEFAULT_SUCCESS_PROBABILITY;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "PARKING_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// `$PARKING_CONFIG`, else `<config dir>/parking-engine/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parking-engine")
        .join("config.toml")
}

// ── Sections ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    pub default_vehicle_type: VehicleType,
    /// Window assumed for open-ended reservations
    pub default_window_minutes: i64,
    /// Largest accepted difference between paid amount and quoted fee
    pub payment_tolerance: Decimal,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            default_vehicle_type: VehicleType::Car,
            default_window_minutes: 120,
            payment_tolerance: Decimal::ONE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRate {
    pub location_id: i64,
    pub vehicle_type: VehicleType,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Hourly rate when nothing more specific applies
    pub default_rate: Decimal,
    /// Keyed by vehicle type name ("CAR", "EV", ...)
    pub vehicle_rates: HashMap<String, Decimal>,
    pub location_rates: Vec<LocationRate>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_rate: Decimal::TWO,
            vehicle_rates: HashMap::new(),
            location_rates: Vec::new(),
        }
    }
}

impl PricingConfig {
    pub fn to_table(&self) -> Result<PricingTable, ConfigError> {
        let mut table = PricingTable::new(self.default_rate);
        for (name, rate) in &self.vehicle_rates {
            let vehicle_type: VehicleType = name.parse().map_err(|_| {
                ConfigError::Invalid(format!("pricing.vehicle_rates: unknown vehicle type '{name}'"))
            })?;
            table = table.with_vehicle_rate(vehicle_type, *rate);
        }
        for lr in &self.location_rates {
            table = table.with_location_rate(lr.location_id, lr.vehicle_type, lr.rate);
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub success_probability: f64,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            success_probability: DEFAULT_SUCCESS_PROBABILITY,
            seed: None,
        }
    }
}

// ── AppConfig ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub booking: BookingConfig,
    pub pricing: PricingConfig,
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.booking.default_window_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "booking.default_window_minutes must be positive".into(),
            ));
        }
        if self.booking.payment_tolerance < Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "booking.payment_tolerance must not be negative".into(),
            ));
        }
        if self.pricing.default_rate < Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "pricing.default_rate must not be negative".into(),
            ));
        }
        self.pricing.to_table()?;
        Ok(())
    }

    pub fn booking_settings(&self) -> BookingSettings {
        BookingSettings {
            default_vehicle_type: self.booking.default_vehicle_type,
            default_window: Duration::minutes(self.booking.default_window_minutes),
            payment_tolerance: self.booking.payment_tolerance,
        }
    }
}
