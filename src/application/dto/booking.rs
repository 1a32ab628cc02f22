//! Booking DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Booking, BookingStatus, FeeQuote, PaymentStatus, VehicleType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub slot_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,
    pub entry_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_time: Option<DateTime<Utc>>,
}

impl ReserveRequest {
    /// Open-ended reservation starting now
    pub fn now(user_id: Option<i64>, slot_id: i64) -> Self {
        Self {
            user_id,
            slot_id,
            vehicle_type: None,
            entry_time: Some(Utc::now()),
            exit_time: None,
        }
    }

    pub fn vehicle(mut self, vehicle_type: VehicleType) -> Self {
        self.vehicle_type = Some(vehicle_type);
        self
    }

    pub fn window(mut self, entry: DateTime<Utc>, exit: Option<DateTime<Utc>>) -> Self {
        self.entry_time = Some(entry);
        self.exit_time = exit;
        self
    }
}

/// Quote handed back by checkout; payment is still outstanding.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub booking_id: i64,
    pub slot_id: i64,
    pub vehicle_type: Option<VehicleType>,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub billed_hours: i64,
    pub rate: Decimal,
    pub fee: Decimal,
    pub pending: bool,
}

impl CheckoutSummary {
    pub fn new(booking: &Booking, exit_time: DateTime<Utc>, quote: &FeeQuote) -> Self {
        Self {
            booking_id: booking.id,
            slot_id: booking.slot_id,
            vehicle_type: booking.vehicle_type,
            entry_time: booking.entry_time,
            exit_time,
            duration_minutes: quote.duration_minutes,
            billed_hours: quote.billed_hours,
            rate: quote.rate,
            fee: quote.fee,
            pending: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentConfirmation {
    pub booking_id: i64,
    pub transaction_id: String,
    pub amount: Decimal,
    pub payment_method: String,
    pub paid_at: DateTime<Utc>,
    pub message: String,
}

/// Payment view of one booking
#[derive(Debug, Clone, Serialize)]
pub struct PaymentDetails {
    pub booking_id: i64,
    pub status: BookingStatus,
    pub amount: Option<Decimal>,
    pub payment_status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
    pub payment_time: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
}

impl From<&Booking> for PaymentDetails {
    fn from(b: &Booking) -> Self {
        Self {
            booking_id: b.id,
            status: b.status,
            amount: b.parking_fee,
            payment_status: b.payment_status,
            transaction_id: b.transaction_id.clone(),
            payment_time: b.payment_time,
            payment_method: b.payment_method.clone(),
        }
    }
}
