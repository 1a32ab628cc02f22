//! Booking engine
//!
//! Reservation, checkout, payment, cancellation and repair of parking
//! bookings. Every write that touches a slot runs inside a
//! [`SlotTransaction`](crate::domain::SlotTransaction); booking-only writes use
//! the store's "update while ACTIVE" so a concurrent cancel always wins.
//!
//! The payment gateway is called with no slot lock held. Checkout and payment
//! are two separate steps joined by the booking's PENDING_PAYMENT state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::application::dto::{
    CheckoutSummary, PaymentConfirmation, PaymentDetails, ReserveRequest,
};
use crate::domain::{
    resolve_vehicle_type, AuditAction, AuditEntry, Booking, BookingStatus, BookingWindow,
    DomainError, DomainResult, FeeCalculator, PaymentError, PaymentProcessor, PaymentStatus,
    RepositoryProvider, SlotTransaction, VehicleType,
};
use crate::shared::errors::InfraError;

/// Engine-wide booking rules
#[derive(Debug, Clone)]
pub struct BookingSettings {
    /// Used when neither the request nor the user names a vehicle type,
    /// and for slots without a designated type
    pub default_vehicle_type: VehicleType,
    /// Length assumed for reservations without an exit time
    pub default_window: Duration,
    /// Paid amounts further than this from the quoted fee replace the fee
    pub payment_tolerance: Decimal,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            default_vehicle_type: VehicleType::Car,
            default_window: Duration::minutes(120),
            payment_tolerance: Decimal::ONE,
        }
    }
}

pub struct BookingService {
    repos: Arc<dyn RepositoryProvider>,
    payments: Arc<dyn PaymentProcessor>,
    fees: FeeCalculator,
    settings: BookingSettings,
}

impl BookingService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        payments: Arc<dyn PaymentProcessor>,
        fees: FeeCalculator,
        settings: BookingSettings,
    ) -> Self {
        Self {
            repos,
            payments,
            fees,
            settings,
        }
    }

    pub fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    pub fn fees(&self) -> &FeeCalculator {
        &self.fees
    }

    // ── Reserve ─────────────────────────────────────────────────

    /// Reserve a slot.
    ///
    /// Checks run in this order: input, user, slot existence, overlapping
    /// ACTIVE bookings (`Conflict`), availability (`Unavailable`),
    /// maintenance (`UnderMaintenance`), vehicle type (`TypeMismatch`).
    pub async fn reserve(&self, req: ReserveRequest) -> DomainResult<Booking> {
        let result = self.try_reserve(req).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::counter!("parking_reservations_total", "outcome" => outcome).increment(1);
        result
    }

    async fn try_reserve(&self, req: ReserveRequest) -> DomainResult<Booking> {
        let entry = req
            .entry_time
            .ok_or_else(|| DomainError::InvalidInput("entry time is required".into()))?;
        if let Some(exit) = req.exit_time {
            if exit < entry {
                return Err(DomainError::InvalidInput(
                    "exit time must not precede entry time".into(),
                ));
            }
        }

        // Resolved before the slot is locked: store reads outside the slot
        // transaction must not happen while it is open.
        let vehicle_type = self.effective_vehicle_type(req.user_id, req.vehicle_type).await?;
        let window = BookingWindow::for_request(entry, req.exit_time, self.settings.default_window);

        let mut tx = self.repos.begin_slot_transaction(req.slot_id).await?;

        if tx.has_active_conflict(&window).await? {
            debug!(slot_id = req.slot_id, %entry, "Overlapping ACTIVE booking");
            return Err(DomainError::Conflict(format!(
                "slot {} already has an active booking overlapping the requested time",
                req.slot_id
            )));
        }

        let mut slot = tx.slot().clone();
        if !slot.available {
            return Err(DomainError::Unavailable(slot.id));
        }
        if slot.disabled {
            return Err(DomainError::UnderMaintenance {
                slot_id: slot.id,
                notes: slot.maintenance_notes.clone(),
            });
        }
        if !slot.accepts(vehicle_type, self.settings.default_vehicle_type) {
            return Err(DomainError::TypeMismatch {
                slot_type: slot.effective_type(self.settings.default_vehicle_type),
                vehicle_type: vehicle_type.to_string(),
            });
        }

        let booking = tx
            .insert_booking(Booking::new(
                req.user_id,
                slot.id,
                vehicle_type,
                entry,
                req.exit_time,
            ))
            .await?;
        slot.occupy();
        tx.update_slot(slot).await?;
        tx.commit().await?;

        info!(
            booking_id = booking.id,
            slot_id = booking.slot_id,
            user_id = ?booking.user_id,
            vehicle_type = %vehicle_type,
            "🅿️ Slot reserved"
        );
        Ok(booking)
    }

    async fn effective_vehicle_type(
        &self,
        user_id: Option<i64>,
        requested: Option<VehicleType>,
    ) -> DomainResult<VehicleType> {
        let system_default = self.settings.default_vehicle_type;
        let Some(user_id) = user_id else {
            return Ok(resolve_vehicle_type(requested, &[], None, system_default));
        };

        let user = self
            .repos
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", user_id))?;
        let vehicles = self.repos.users().vehicles_for_user(user_id).await?;

        Ok(resolve_vehicle_type(
            requested,
            &vehicles,
            user.vehicle_type,
            system_default,
        ))
    }

    // ── Checkout ────────────────────────────────────────────────

    /// Check out now. The slot stays taken until payment succeeds.
    pub async fn checkout(&self, booking_id: i64) -> DomainResult<CheckoutSummary> {
        self.checkout_at(booking_id, Utc::now()).await
    }

    /// Check out with an explicit exit time.
    ///
    /// Running it again on a booking that is waiting for payment replaces
    /// the quote.
    pub async fn checkout_at(
        &self,
        booking_id: i64,
        exit_time: DateTime<Utc>,
    ) -> DomainResult<CheckoutSummary> {
        let mut booking = self.get_booking(booking_id).await?;
        if !booking.is_active() {
            return Err(not_active(&booking));
        }

        let location_id = match self.repos.slots().find_by_id(booking.slot_id).await? {
            Some(slot) => slot.location_id,
            None => {
                warn!(booking_id, slot_id = booking.slot_id, "Booking references a missing slot");
                None
            }
        };

        let quote = self.fees.calculate_fee(
            booking.entry_time,
            exit_time,
            booking.vehicle_type,
            location_id,
        );
        booking.mark_checked_out(exit_time, quote.fee);

        if !self.repos.bookings().update_if_active(&booking).await? {
            // Cancelled between the read and the write.
            let current = self.get_booking(booking_id).await?;
            return Err(not_active(&current));
        }

        metrics::counter!("parking_checkouts_total").increment(1);
        info!(
            booking_id,
            slot_id = booking.slot_id,
            minutes = quote.duration_minutes,
            billed_hours = quote.billed_hours,
            fee = %quote.fee,
            "Checked out, awaiting payment"
        );
        Ok(CheckoutSummary::new(&booking, exit_time, &quote))
    }

    // ── Payment ─────────────────────────────────────────────────

    /// Pay for a checked-out booking and release its slot.
    ///
    /// A declined payment leaves the booking waiting for payment; the caller
    /// may retry.
    pub async fn confirm_payment(
        &self,
        booking_id: i64,
        principal: &str,
        amount: Option<Decimal>,
        method: &str,
    ) -> DomainResult<PaymentConfirmation> {
        let result = self
            .try_confirm_payment(booking_id, principal, amount, method)
            .await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::counter!("parking_payments_total", "outcome" => outcome).increment(1);
        result
    }

    async fn try_confirm_payment(
        &self,
        booking_id: i64,
        principal: &str,
        amount: Option<Decimal>,
        method: &str,
    ) -> DomainResult<PaymentConfirmation> {
        let user_id = self.require_user(principal).await?;
        let mut booking = self.get_booking(booking_id).await?;
        if !booking.belongs_to(user_id) {
            return Err(DomainError::Unauthorized(format!(
                "booking {booking_id} does not belong to {principal}"
            )));
        }

        let amount =
            amount.ok_or_else(|| DomainError::InvalidInput("payment amount is required".into()))?;
        if amount <= Decimal::ZERO {
            return Err(DomainError::InvalidAmount(amount));
        }

        if booking.is_completed() {
            return Err(DomainError::AlreadyCompleted(booking_id));
        }
        if !booking.is_active() {
            return Err(not_active(&booking));
        }
        if !booking.is_awaiting_payment() {
            return Err(DomainError::InvalidInput(format!(
                "booking {booking_id} has not been checked out"
            )));
        }

        let quoted = booking.parking_fee.unwrap_or(Decimal::ZERO);
        if (amount - quoted).abs() > self.settings.payment_tolerance {
            warn!(
                booking_id,
                quoted = %quoted,
                paid = %amount,
                "Paid amount differs from quote, replacing fee"
            );
            booking.parking_fee = Some(amount);
            if !self.repos.bookings().update_if_active(&booking).await? {
                let current = self.get_booking(booking_id).await?;
                return Err(not_active(&current));
            }
        }

        let receipt = match self.payments.process(amount).await {
            Ok(receipt) => receipt,
            Err(PaymentError::Declined(message)) => {
                info!(booking_id, %amount, "💳 Payment declined");
                return Err(DomainError::PaymentDeclined(message));
            }
            Err(PaymentError::InvalidAmount(a)) => return Err(DomainError::InvalidAmount(a)),
        };

        let paid_at = Utc::now();
        self.finalize_payment(booking_id, booking.slot_id, &receipt.transaction_id, paid_at, method)
            .await
            .inspect_err(|e| {
                error!(
                    booking_id,
                    transaction_id = %receipt.transaction_id,
                    %amount,
                    error = %e,
                    "Payment captured but booking could not be completed, refund required"
                );
            })?;

        info!(
            booking_id,
            transaction_id = %receipt.transaction_id,
            %amount,
            method,
            "💳 Payment completed, slot released"
        );
        Ok(PaymentConfirmation {
            booking_id,
            transaction_id: receipt.transaction_id,
            amount,
            payment_method: method.to_string(),
            paid_at,
            message: receipt.message,
        })
    }

    async fn finalize_payment(
        &self,
        booking_id: i64,
        slot_id: i64,
        transaction_id: &str,
        paid_at: DateTime<Utc>,
        method: &str,
    ) -> DomainResult<()> {
        let mut tx = self.repos.begin_slot_transaction(slot_id).await?;

        let mut booking = tx
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking_id))?;
        if !booking.is_active() {
            return Err(not_active(&booking));
        }
        // A repair during the gateway call returns the booking to pre-checkout.
        if !booking.is_awaiting_payment() {
            return Err(DomainError::InvalidInput(format!(
                "booking {booking_id} is no longer awaiting payment"
            )));
        }

        booking.complete(transaction_id.to_string(), paid_at, Some(method.to_string()));
        tx.update_booking(booking).await?;

        let mut slot = tx.slot().clone();
        slot.release();
        tx.update_slot(slot).await?;
        tx.commit().await
    }

    // ── Cancel ──────────────────────────────────────────────────

    /// Cancel free of charge and release the slot.
    ///
    /// Cancelling a cancelled booking releases its slot again unless another
    /// ACTIVE booking now holds it.
    pub async fn cancel(&self, booking_id: i64) -> DomainResult<Booking> {
        let booking = self.get_booking(booking_id).await?;
        if booking.is_completed() {
            return Err(DomainError::AlreadyCompleted(booking_id));
        }

        let mut tx = self.repos.begin_slot_transaction(booking.slot_id).await?;
        let mut booking = tx
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking_id))?;
        // Payment may have completed while waiting for the lock.
        if booking.is_completed() {
            return Err(DomainError::AlreadyCompleted(booking_id));
        }

        let was_active = booking.is_active();
        if was_active {
            booking.cancel(Utc::now());
            tx.update_booking(booking.clone()).await?;
        }

        release_if_unheld(tx.as_mut()).await?;
        tx.commit().await?;

        if was_active {
            metrics::counter!("parking_cancellations_total").increment(1);
            info!(booking_id, slot_id = booking.slot_id, "Booking cancelled");
        } else {
            debug!(booking_id, "Booking already cancelled, slot release re-applied");
        }
        Ok(booking)
    }

    // ── Repair ──────────────────────────────────────────────────

    /// Return an ACTIVE booking that carries an exit time to its
    /// pre-checkout state. Any other booking is returned unchanged.
    pub async fn repair_stranded_booking(&self, booking_id: i64) -> DomainResult<Booking> {
        let mut booking = self.get_booking(booking_id).await?;
        if !booking.is_stranded() {
            info!(
                booking_id,
                status = %booking.status,
                "Repair requested, booking needs no changes"
            );
            return Ok(booking);
        }

        let before = checkout_fields(&booking)?;
        booking.clear_checkout();
        let after = checkout_fields(&booking)?;

        if !self.repos.bookings().update_if_active(&booking).await? {
            // Cancelled meanwhile; nothing left to repair.
            return self.get_booking(booking_id).await;
        }

        warn!(
            booking_id,
            slot_id = booking.slot_id,
            "🔧 Repaired stranded booking, checkout data cleared"
        );
        metrics::counter!("parking_repairs_total").increment(1);

        self.repos
            .audit_log()
            .record(
                AuditEntry::new(
                    AuditAction::Repair,
                    "Booking",
                    booking_id,
                    json!({ "before": before, "after": after }),
                )
                .by(booking.user_id),
            )
            .await?;

        Ok(booking)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn get_booking(&self, booking_id: i64) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking_id))
    }

    /// All bookings of a user, newest entry first
    pub async fn list_bookings(&self, user_id: i64) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_by_user(user_id).await
    }

    pub async fn user_id_for_principal(&self, principal: &str) -> DomainResult<Option<i64>> {
        Ok(self
            .repos
            .users()
            .find_by_email(principal)
            .await?
            .map(|u| u.id))
    }

    /// Completed (paid) bookings of the caller
    pub async fn payment_history(&self, principal: &str) -> DomainResult<Vec<Booking>> {
        let user_id = self.require_user(principal).await?;
        let bookings = self.repos.bookings().find_by_user(user_id).await?;
        Ok(bookings
            .into_iter()
            .filter(|b| b.status == BookingStatus::Completed)
            .collect())
    }

    pub async fn payment_details(
        &self,
        booking_id: i64,
        principal: &str,
    ) -> DomainResult<PaymentDetails> {
        let user_id = self.require_user(principal).await?;
        let booking = self.get_booking(booking_id).await?;
        if !booking.belongs_to(user_id) {
            return Err(DomainError::Unauthorized(format!(
                "booking {booking_id} does not belong to {principal}"
            )));
        }
        Ok(PaymentDetails::from(&booking))
    }

    pub async fn active_bookings(&self) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_by_status(BookingStatus::Active).await
    }

    pub async fn bookings_for_slot(&self, slot_id: i64) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_by_slot(slot_id).await
    }

    async fn require_user(&self, principal: &str) -> DomainResult<i64> {
        self.user_id_for_principal(principal)
            .await?
            .ok_or_else(|| DomainError::Unauthorized(format!("unknown principal {principal}")))
    }
}

fn not_active(booking: &Booking) -> DomainError {
    DomainError::NotActive {
        booking_id: booking.id,
        status: booking.status.to_string(),
    }
}

/// Checkout state recorded in repair audit entries
#[derive(Serialize)]
struct CheckoutFields {
    exit_time: Option<DateTime<Utc>>,
    parking_fee: Option<Decimal>,
    payment_status: Option<PaymentStatus>,
}

fn checkout_fields(booking: &Booking) -> DomainResult<serde_json::Value> {
    let fields = CheckoutFields {
        exit_time: booking.exit_time,
        parking_fee: booking.parking_fee,
        payment_status: booking.payment_status,
    };
    Ok(serde_json::to_value(fields).map_err(InfraError::from)?)
}

/// Mark the locked slot available unless an ACTIVE booking still holds it.
async fn release_if_unheld(tx: &mut dyn SlotTransaction) -> DomainResult<()> {
    if tx.has_active_conflict(&BookingWindow::unbounded()).await? {
        debug!(slot_id = tx.slot().id, "Slot still held by another booking");
        return Ok(());
    }
    let mut slot = tx.slot().clone();
    slot.release();
    tx.update_slot(slot).await
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        NewSlot, NewUser, NewVehicle, PaymentReceipt, PricingTable, Slot,
    };
    use crate::infrastructure::{InMemoryStorage, SimulatedPaymentProcessor};
    use async_trait::async_trait;
    use std::str::FromStr;

    const OWNER: &str = "driver@example.com";

    struct Fixture {
        storage: Arc<InMemoryStorage>,
        service: BookingService,
        user_id: i64,
        slot: Slot,
    }

    async fn fixture_with(payments: Arc<dyn PaymentProcessor>) -> Fixture {
        let storage = Arc::new(InMemoryStorage::new());
        let user = storage
            .users()
            .create(NewUser {
                email: OWNER.into(),
                name: "Driver".into(),
                vehicle_type: None,
            })
            .await
            .unwrap();
        storage
            .users()
            .add_vehicle(NewVehicle {
                user_id: user.id,
                vehicle_type: VehicleType::Car,
                plate: Some("01A123BC".into()),
                is_default: true,
            })
            .await
            .unwrap();
        let slot = storage
            .slots()
            .create(NewSlot {
                number: "A-1".into(),
                slot_type: Some("CAR".into()),
                location_id: None,
            })
            .await
            .unwrap();

        let service = BookingService::new(
            storage.clone(),
            payments,
            FeeCalculator::new(PricingTable::new(Decimal::TWO)),
            BookingSettings::default(),
        );
        Fixture {
            storage,
            service,
            user_id: user.id,
            slot,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(SimulatedPaymentProcessor::always_approve())).await
    }

    impl Fixture {
        async fn slot_available(&self) -> bool {
            self.storage
                .slots()
                .find_by_id(self.slot.id)
                .await
                .unwrap()
                .unwrap()
                .available
        }

        async fn reserve_at(&self, entry: DateTime<Utc>) -> DomainResult<Booking> {
            self.service
                .reserve(
                    ReserveRequest::now(Some(self.user_id), self.slot.id)
                        .vehicle(VehicleType::Car)
                        .window(entry, None),
                )
                .await
        }

        async fn checked_out(&self) -> Booking {
            let entry = Utc::now() - Duration::minutes(90);
            let booking = self.reserve_at(entry).await.unwrap();
            self.service
                .checkout_at(booking.id, entry + Duration::minutes(90))
                .await
                .unwrap();
            self.service.get_booking(booking.id).await.unwrap()
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn overlapping_reservation_conflicts() {
        let f = fixture().await;
        let t = Utc::now();

        let first = f.reserve_at(t).await.unwrap();
        assert_eq!(first.status, BookingStatus::Active);
        assert!(!f.slot_available().await);

        let err = f.reserve_at(t + Duration::minutes(30)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn taken_slot_rejects_non_overlapping_window() {
        let f = fixture().await;
        let t = Utc::now();
        f.reserve_at(t).await.unwrap();

        // The first booking is open-ended, so any later window overlaps it.
        let err = f.reserve_at(t + Duration::hours(5)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // A closed earlier window does not overlap, but the slot is taken.
        let err = f
            .service
            .reserve(
                ReserveRequest::now(Some(f.user_id), f.slot.id)
                    .window(t - Duration::hours(4), Some(t - Duration::hours(3))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unavailable(id) if id == f.slot.id));
    }

    #[tokio::test]
    async fn disabled_slot_is_under_maintenance() {
        let f = fixture().await;
        let mut tx = f.storage.begin_slot_transaction(f.slot.id).await.unwrap();
        let mut slot = tx.slot().clone();
        slot.disabled = true;
        slot.maintenance_notes = Some("repainting".into());
        tx.update_slot(slot).await.unwrap();
        tx.commit().await.unwrap();

        let err = f.reserve_at(Utc::now()).await.unwrap_err();
        assert!(matches!(err, DomainError::UnderMaintenance { .. }));
        assert!(f.slot_available().await);
    }

    #[tokio::test]
    async fn vehicle_type_must_match_slot() {
        let f = fixture().await;
        let bike_slot = f
            .storage
            .slots()
            .create(NewSlot {
                number: "B-1".into(),
                slot_type: Some("bike".into()),
                location_id: None,
            })
            .await
            .unwrap();

        // The user only has a CAR registered, so the request resolves to CAR.
        let err = f
            .service
            .reserve(ReserveRequest::now(Some(f.user_id), bike_slot.id).vehicle(VehicleType::Bike))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::TypeMismatch { .. }));

        // Anonymous bookings use the requested type as is.
        let booking = f
            .service
            .reserve(ReserveRequest::now(None, bike_slot.id).vehicle(VehicleType::Bike))
            .await
            .unwrap();
        assert_eq!(booking.vehicle_type, Some(VehicleType::Bike));
    }

    #[tokio::test]
    async fn untyped_slot_takes_default_vehicle() {
        let f = fixture().await;
        let slot = f
            .storage
            .slots()
            .create(NewSlot {
                number: "C-1".into(),
                slot_type: None,
                location_id: None,
            })
            .await
            .unwrap();

        assert!(f.service.reserve(ReserveRequest::now(None, slot.id)).await.is_ok());
    }

    #[tokio::test]
    async fn reserve_validates_input() {
        let f = fixture().await;
        let mut req = ReserveRequest::now(None, f.slot.id);
        req.entry_time = None;
        assert!(matches!(
            f.service.reserve(req).await,
            Err(DomainError::InvalidInput(_))
        ));

        let t = Utc::now();
        let req = ReserveRequest::now(None, f.slot.id).window(t, Some(t - Duration::minutes(1)));
        assert!(matches!(
            f.service.reserve(req).await,
            Err(DomainError::InvalidInput(_))
        ));

        assert!(matches!(
            f.service.reserve(ReserveRequest::now(Some(999), f.slot.id)).await,
            Err(DomainError::NotFound { entity: "User", .. })
        ));
        assert!(matches!(
            f.service.reserve(ReserveRequest::now(None, 999)).await,
            Err(DomainError::NotFound { entity: "Slot", .. })
        ));
    }

    #[tokio::test]
    async fn checkout_quotes_and_keeps_slot_taken() {
        let f = fixture().await;
        let entry = Utc::now() - Duration::minutes(90);
        let booking = f.reserve_at(entry).await.unwrap();

        let summary = f
            .service
            .checkout_at(booking.id, entry + Duration::minutes(90))
            .await
            .unwrap();
        assert_eq!(summary.fee, Decimal::from(4));
        assert_eq!(summary.billed_hours, 2);
        assert_eq!(summary.duration_minutes, 90);
        assert!(summary.pending);

        let stored = f.service.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.payment_status, Some(PaymentStatus::PendingPayment));
        assert_eq!(stored.status, BookingStatus::Active);
        assert!(!f.slot_available().await);
    }

    #[tokio::test]
    async fn checkout_of_cancelled_booking_is_not_active() {
        let f = fixture().await;
        let booking = f.reserve_at(Utc::now()).await.unwrap();
        f.service.cancel(booking.id).await.unwrap();

        let err = f.service.checkout(booking.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotActive { .. }));
        assert!(matches!(
            f.service.checkout(12345).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn successful_payment_completes_and_releases() {
        let f = fixture().await;
        let booking = f.checked_out().await;

        let confirmation = f
            .service
            .confirm_payment(booking.id, OWNER, Some(Decimal::from(4)), "CARD")
            .await
            .unwrap();
        assert!(confirmation.transaction_id.starts_with("TXN_"));

        let stored = f.service.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Completed);
        assert_eq!(stored.payment_status, Some(PaymentStatus::Paid));
        assert_eq!(stored.payment_method.as_deref(), Some("CARD"));
        assert!(stored.transaction_id.is_some());
        assert!(f.slot_available().await);

        let err = f
            .service
            .confirm_payment(booking.id, OWNER, Some(Decimal::from(4)), "CARD")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyCompleted(_)));
    }

    #[tokio::test]
    async fn amount_within_tolerance_keeps_fee() {
        let f = fixture_with(Arc::new(SimulatedPaymentProcessor::always_decline())).await;
        let mut booking = f.checked_out().await;
        booking.parking_fee = Some(Decimal::from(3));
        assert!(f.storage.bookings().update_if_active(&booking).await.unwrap());

        // Difference of exactly 1 is not above the tolerance.
        let _ = f
            .service
            .confirm_payment(booking.id, OWNER, Some(Decimal::from(4)), "CARD")
            .await;
        let stored = f.service.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.parking_fee, Some(Decimal::from(3)));

        let _ = f
            .service
            .confirm_payment(booking.id, OWNER, Some(Decimal::from(5)), "CARD")
            .await;
        let stored = f.service.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.parking_fee, Some(Decimal::from(5)));
    }

    #[tokio::test]
    async fn declined_payment_leaves_booking_pending() {
        let f = fixture_with(Arc::new(SimulatedPaymentProcessor::always_decline())).await;
        let booking = f.checked_out().await;

        let err = f
            .service
            .confirm_payment(booking.id, OWNER, Some(dec("4.00")), "CARD")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PaymentDeclined(_)));

        let stored = f.service.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Active);
        assert_eq!(stored.payment_status, Some(PaymentStatus::PendingPayment));
        assert!(!f.slot_available().await);
    }

    #[tokio::test]
    async fn payment_preconditions() {
        let f = fixture().await;
        let booking = f.reserve_at(Utc::now()).await.unwrap();

        assert!(matches!(
            f.service
                .confirm_payment(booking.id, "stranger@example.com", Some(Decimal::ONE), "CARD")
                .await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            f.service.confirm_payment(booking.id, OWNER, None, "CARD").await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            f.service
                .confirm_payment(booking.id, OWNER, Some(Decimal::ZERO), "CARD")
                .await,
            Err(DomainError::InvalidAmount(_))
        ));
        // Not checked out yet.
        assert!(matches!(
            f.service
                .confirm_payment(booking.id, OWNER, Some(Decimal::ONE), "CARD")
                .await,
            Err(DomainError::InvalidInput(_))
        ));

        let other = f
            .storage
            .users()
            .create(NewUser {
                email: "other@example.com".into(),
                name: "Other".into(),
                vehicle_type: None,
            })
            .await
            .unwrap();
        assert!(other.id != f.user_id);
        assert!(matches!(
            f.service
                .confirm_payment(booking.id, "other@example.com", Some(Decimal::ONE), "CARD")
                .await,
            Err(DomainError::Unauthorized(_))
        ));
    }

    /// Cancels the booking while the "gateway" is processing.
    struct CancellingGateway {
        storage: Arc<InMemoryStorage>,
        booking_id: i64,
    }

    #[async_trait]
    impl PaymentProcessor for CancellingGateway {
        async fn process(&self, _amount: Decimal) -> Result<PaymentReceipt, PaymentError> {
            let booking = self
                .storage
                .bookings()
                .find_by_id(self.booking_id)
                .await
                .unwrap()
                .unwrap();
            let mut tx = self
                .storage
                .begin_slot_transaction(booking.slot_id)
                .await
                .unwrap();
            let mut cancelled = booking.clone();
            cancelled.cancel(Utc::now());
            tx.update_booking(cancelled).await.unwrap();
            tx.commit().await.unwrap();

            Ok(PaymentReceipt {
                transaction_id: "TXN_0000000000000001".into(),
                message: "Payment successful".into(),
            })
        }
    }

    #[tokio::test]
    async fn cancel_during_payment_is_not_overwritten() {
        let storage = Arc::new(InMemoryStorage::new());
        let user = storage
            .users()
            .create(NewUser {
                email: OWNER.into(),
                name: "Driver".into(),
                vehicle_type: Some(VehicleType::Car),
            })
            .await
            .unwrap();
        let slot = storage.slots().create(NewSlot::default()).await.unwrap();

        let setup = BookingService::new(
            storage.clone(),
            Arc::new(SimulatedPaymentProcessor::always_approve()),
            FeeCalculator::default(),
            BookingSettings::default(),
        );
        let booking = setup
            .reserve(ReserveRequest::now(Some(user.id), slot.id))
            .await
            .unwrap();
        setup.checkout(booking.id).await.unwrap();

        let service = BookingService::new(
            storage.clone(),
            Arc::new(CancellingGateway {
                storage: storage.clone(),
                booking_id: booking.id,
            }),
            FeeCalculator::default(),
            BookingSettings::default(),
        );
        let err = service
            .confirm_payment(booking.id, OWNER, Some(Decimal::TWO), "CARD")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotActive { .. }));

        let stored = service.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert!(stored.transaction_id.is_none());
    }

    /// Gateway that repairs the booking while the charge is in flight
    struct RepairingGateway {
        repairer: BookingService,
        booking_id: i64,
    }

    #[async_trait]
    impl PaymentProcessor for RepairingGateway {
        async fn process(&self, _amount: Decimal) -> Result<PaymentReceipt, PaymentError> {
            self.repairer
                .repair_stranded_booking(self.booking_id)
                .await
                .unwrap();
            Ok(PaymentReceipt {
                transaction_id: "TXN_0000000000000002".into(),
                message: "Payment successful".into(),
            })
        }
    }

    #[tokio::test]
    async fn repair_during_payment_is_not_completed() {
        let f = fixture().await;
        let booking = f.checked_out().await;

        let service = BookingService::new(
            f.storage.clone(),
            Arc::new(RepairingGateway {
                repairer: BookingService::new(
                    f.storage.clone(),
                    Arc::new(SimulatedPaymentProcessor::always_approve()),
                    FeeCalculator::default(),
                    BookingSettings::default(),
                ),
                booking_id: booking.id,
            }),
            FeeCalculator::default(),
            BookingSettings::default(),
        );
        let err = service
            .confirm_payment(booking.id, OWNER, booking.parking_fee, "CARD")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let stored = service.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Active);
        assert!(stored.exit_time.is_none());
        assert!(stored.payment_status.is_none());
        assert!(stored.transaction_id.is_none());
        assert!(!f.slot_available().await);
    }

    #[tokio::test]
    async fn cancel_then_reserve_again() {
        let f = fixture().await;
        let t = Utc::now();
        let booking = f.reserve_at(t).await.unwrap();

        let cancelled = f.service.cancel(booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(cancelled.exit_time.is_some());
        assert!(f.slot_available().await);

        // Idempotent.
        assert!(f.service.cancel(booking.id).await.is_ok());

        let again = f.reserve_at(t + Duration::hours(3)).await.unwrap();
        assert_eq!(again.status, BookingStatus::Active);
    }

    #[tokio::test]
    async fn repeated_cancel_keeps_newer_booking_holding_slot() {
        let f = fixture().await;
        let old = f.reserve_at(Utc::now()).await.unwrap();
        f.service.cancel(old.id).await.unwrap();
        f.reserve_at(Utc::now()).await.unwrap();

        f.service.cancel(old.id).await.unwrap();
        assert!(!f.slot_available().await);
    }

    #[tokio::test]
    async fn completed_booking_cannot_be_cancelled() {
        let f = fixture().await;
        let booking = f.checked_out().await;
        f.service
            .confirm_payment(booking.id, OWNER, Some(Decimal::from(4)), "CASH")
            .await
            .unwrap();

        assert!(matches!(
            f.service.cancel(booking.id).await,
            Err(DomainError::AlreadyCompleted(_))
        ));
    }

    #[tokio::test]
    async fn repair_clears_checkout_and_audits() {
        let f = fixture().await;
        let booking = f.checked_out().await;

        let repaired = f.service.repair_stranded_booking(booking.id).await.unwrap();
        assert_eq!(repaired.status, BookingStatus::Active);
        assert!(repaired.exit_time.is_none());
        assert!(repaired.parking_fee.is_none());
        assert!(repaired.payment_status.is_none());

        let audit = f
            .storage
            .audit_log()
            .find_for_entity("Booking", booking.id)
            .await
            .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::Repair);
        assert!(audit[0].changes["before"]["exit_time"].is_string());
        assert!(audit[0].changes["after"]["exit_time"].is_null());
    }

    #[tokio::test]
    async fn repair_of_clean_booking_is_noop() {
        let f = fixture().await;
        let booking = f.reserve_at(Utc::now()).await.unwrap();

        let same = f.service.repair_stranded_booking(booking.id).await.unwrap();
        assert!(same.exit_time.is_none());
        assert_eq!(same, booking);
        assert!(f
            .storage
            .audit_log()
            .find_for_entity("Booking", booking.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn payment_views_are_owner_only() {
        let f = fixture().await;
        let booking = f.checked_out().await;
        f.service
            .confirm_payment(booking.id, OWNER, Some(Decimal::from(4)), "CARD")
            .await
            .unwrap();

        let history = f.service.payment_history(OWNER).await.unwrap();
        assert_eq!(history.len(), 1);

        let details = f.service.payment_details(booking.id, OWNER).await.unwrap();
        assert_eq!(details.amount, Some(Decimal::from(4)));
        assert_eq!(details.payment_status, Some(PaymentStatus::Paid));

        assert!(matches!(
            f.service.payment_history("nobody@example.com").await,
            Err(DomainError::Unauthorized(_))
        ));
        assert_eq!(
            f.service.user_id_for_principal(OWNER).await.unwrap(),
            Some(f.user_id)
        );
    }

    #[tokio::test]
    async fn concurrent_reservations_admit_one() {
        let f = fixture().await;
        let service = Arc::new(f.service);
        let entry = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let service = service.clone();
            let slot_id = f.slot.id;
            handles.push(tokio::spawn(async move {
                service
                    .reserve(ReserveRequest::now(None, slot_id).window(entry, None))
                    .await
            }));
        }

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(
                    e,
                    DomainError::Conflict(_) | DomainError::Unavailable(_)
                )),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(
            f.storage
                .bookings()
                .find_by_status(BookingStatus::Active)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
