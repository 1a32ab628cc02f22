//! Booking domain entity

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::vehicle::VehicleType;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    /// Slot held; covers the checkout-pending sub-state as well
    Active,
    /// Paid and slot released
    Completed,
    /// Cancelled by user or operator, slot released
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse a stored status. Missing/unknown values are treated as ACTIVE,
    /// which keeps the slot held until an operator looks at the record.
    pub fn parse(s: &str) -> Self {
        match s {
            "COMPLETED" => Self::Completed,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Active,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment progress of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    PendingPayment,
    Paid,
    /// Legacy value some stores still carry; treated like PendingPayment
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING_PAYMENT" => Some(Self::PendingPayment),
            "PAID" => Some(Self::Paid),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether a payment may still be attempted
    pub fn is_payable(&self) -> bool {
        matches!(self, Self::PendingPayment | Self::Failed)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Half-open time window `[entry, exit)` a booking occupies a slot for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    pub entry: DateTime<Utc>,
    pub exit: DateTime<Utc>,
}

impl BookingWindow {
    /// Window for a reservation request; `exit` defaults to
    /// `entry + default_length`.
    pub fn for_request(
        entry: DateTime<Utc>,
        exit: Option<DateTime<Utc>>,
        default_length: Duration,
    ) -> Self {
        Self {
            entry,
            exit: exit.unwrap_or(entry + default_length),
        }
    }

    /// Window covering all time; every ACTIVE booking overlaps it.
    pub fn unbounded() -> Self {
        Self {
            entry: DateTime::<Utc>::MIN_UTC,
            exit: DateTime::<Utc>::MAX_UTC,
        }
    }

    /// Whether an existing booking (open-ended when `exit` is `None`)
    /// overlaps this window.
    pub fn overlaps(&self, entry: DateTime<Utc>, exit: Option<DateTime<Utc>>) -> bool {
        entry < self.exit && exit.map_or(true, |e| e > self.entry)
    }
}

/// Parking booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: Option<i64>,
    pub slot_id: i64,
    pub vehicle_type: Option<VehicleType>,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub status: BookingStatus,
    pub parking_fee: Option<Decimal>,
    pub payment_status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
    pub payment_time: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// New ACTIVE booking; the store assigns the ID on insert.
    pub fn new(
        user_id: Option<i64>,
        slot_id: i64,
        vehicle_type: VehicleType,
        entry_time: DateTime<Utc>,
        exit_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: 0,
            user_id,
            slot_id,
            vehicle_type: Some(vehicle_type),
            entry_time,
            exit_time,
            status: BookingStatus::Active,
            parking_fee: None,
            payment_status: None,
            transaction_id: None,
            payment_time: None,
            payment_method: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    pub fn is_completed(&self) -> bool {
        self.status == BookingStatus::Completed
    }

    /// Checked out and waiting for a successful payment
    pub fn is_awaiting_payment(&self) -> bool {
        self.is_active()
            && self.exit_time.is_some()
            && self.payment_status.map_or(false, |p| p.is_payable())
    }

    /// ACTIVE with an exit time: the state `repair` returns to pre-checkout
    pub fn is_stranded(&self) -> bool {
        self.is_active() && self.exit_time.is_some()
    }

    pub fn belongs_to(&self, user_id: i64) -> bool {
        self.user_id == Some(user_id)
    }

    /// Record exit and fee; the booking stays ACTIVE until paid.
    pub fn mark_checked_out(&mut self, exit_time: DateTime<Utc>, fee: Decimal) {
        self.exit_time = Some(exit_time);
        self.parking_fee = Some(fee);
        self.payment_status = Some(PaymentStatus::PendingPayment);
    }

    pub fn complete(
        &mut self,
        transaction_id: String,
        paid_at: DateTime<Utc>,
        method: Option<String>,
    ) {
        self.status = BookingStatus::Completed;
        self.payment_status = Some(PaymentStatus::Paid);
        self.transaction_id = Some(transaction_id);
        self.payment_time = Some(paid_at);
        self.payment_method = method;
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.status = BookingStatus::Cancelled;
        if self.exit_time.is_none() {
            self.exit_time = Some(now);
        }
    }

    /// Back to a clean pre-checkout ACTIVE state
    pub fn clear_checkout(&mut self) {
        self.exit_time = None;
        self.parking_fee = None;
        self.payment_status = None;
    }

    /// Whole minutes between entry and exit (0 while still parked)
    pub fn duration_minutes(&self) -> i64 {
        self.exit_time
            .map(|exit| (exit - self.entry_time).num_minutes().max(0))
            .unwrap_or(0)
    }
}

// ── Tests ──────────────────────────────────────────────────────
