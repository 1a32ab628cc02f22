use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Slot {0} is currently unavailable")]
    Unavailable(i64),

    #[error("Slot {slot_id} is under maintenance{}", .notes.as_deref().map(|n| format!(": {n}")).unwrap_or_default())]
    UnderMaintenance { slot_id: i64, notes: Option<String> },

    #[error("Vehicle type mismatch: slot is designated for {slot_type} vehicles, booking uses {vehicle_type}")]
    TypeMismatch {
        slot_type: String,
        vehicle_type: String,
    },

    #[error("Booking {booking_id} is not active (status: {status})")]
    NotActive { booking_id: i64, status: String },

    #[error("Booking {0} is already completed")]
    AlreadyCompleted(i64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    /// Stable machine-readable code for front ends.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unavailable(_) => "unavailable",
            Self::UnderMaintenance { .. } => "under_maintenance",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::NotActive { .. } => "not_active",
            Self::AlreadyCompleted(_) => "already_completed",
            Self::Unauthorized(_) => "unauthorized",
            Self::PaymentDeclined(_) => "payment_declined",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::Storage(_) => "internal",
        }
    }

    /// Whether this error is an unexpected store failure rather than a
    /// business outcome the caller can act on.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<InfraError> for DomainError {
    fn from(e: InfraError) -> Self {
        DomainError::Storage(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
