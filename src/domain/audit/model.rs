//! Audit entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Stranded booking returned to pre-checkout
    Repair,
    MaintenanceOn,
    MaintenanceOff,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repair => "REPAIR",
            Self::MaintenanceOn => "MAINTENANCE_ON",
            Self::MaintenanceOff => "MAINTENANCE_OFF",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REPAIR" => Some(Self::Repair),
            "MAINTENANCE_ON" => Some(Self::MaintenanceOn),
            "MAINTENANCE_OFF" => Some(Self::MaintenanceOff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: AuditAction,
    /// "Booking", "Slot", ...
    pub entity_type: String,
    pub entity_id: i64,
    /// JSON document describing the change
    pub changes: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: i64,
        changes: serde_json::Value,
    ) -> Self {
        Self {
            id: 0,
            user_id: None,
            action,
            entity_type: entity_type.into(),
            entity_id,
            changes,
            timestamp: Utc::now(),
        }
    }

    pub fn by(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }
}
