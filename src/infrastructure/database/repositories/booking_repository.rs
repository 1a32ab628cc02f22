//! SeaORM implementation of BookingRepository

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set,
};
use tracing::debug;

use super::db_err;
use crate::domain::{
    Booking, BookingRepository, BookingStatus, DomainError, DomainResult, PaymentStatus,
};
use crate::infrastructure::database::entities::booking;

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_where(&self, condition: sea_orm::Condition) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(condition)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(newest_first(models.into_iter().map(model_to_domain).collect()))
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn to_cents(amount: Decimal) -> DomainResult<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.round().to_i64())
        .ok_or(DomainError::InvalidAmount(amount))
}

pub(super) fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub(super) fn model_to_domain(m: booking::Model) -> Booking {
    Booking {
        id: m.id,
        user_id: m.user_id,
        slot_id: m.slot_id,
        vehicle_type: m.vehicle_type.and_then(|v| v.parse().ok()),
        entry_time: m.entry_time,
        exit_time: m.exit_time,
        status: BookingStatus::parse(&m.status),
        parking_fee: m.parking_fee_cents.map(from_cents),
        payment_status: m.payment_status.as_deref().and_then(PaymentStatus::parse),
        transaction_id: m.transaction_id,
        payment_time: m.payment_time,
        payment_method: m.payment_method,
        created_at: m.created_at,
    }
}

/// Every column except the key, which callers set or leave unset.
pub(super) fn domain_to_active(b: &Booking) -> DomainResult<booking::ActiveModel> {
    Ok(booking::ActiveModel {
        id: NotSet,
        user_id: Set(b.user_id),
        slot_id: Set(b.slot_id),
        vehicle_type: Set(b.vehicle_type.map(|v| v.as_str().to_string())),
        entry_time: Set(b.entry_time),
        exit_time: Set(b.exit_time),
        status: Set(b.status.as_str().to_string()),
        parking_fee_cents: Set(b.parking_fee.map(to_cents).transpose()?),
        payment_status: Set(b.payment_status.map(|p| p.as_str().to_string())),
        transaction_id: Set(b.transaction_id.clone()),
        payment_time: Set(b.payment_time),
        payment_method: Set(b.payment_method.clone()),
        created_at: Set(b.created_at),
    })
}

/// SQLite keeps timestamps as text, so ordering happens here.
pub(super) fn newest_first(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by(|a, b| b.entry_time.cmp(&a.entry_time).then(b.id.cmp(&a.id)));
    bookings
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_user(&self, user_id: i64) -> DomainResult<Vec<Booking>> {
        self.find_where(sea_orm::Condition::all().add(booking::Column::UserId.eq(user_id)))
            .await
    }

    async fn find_by_slot(&self, slot_id: i64) -> DomainResult<Vec<Booking>> {
        self.find_where(sea_orm::Condition::all().add(booking::Column::SlotId.eq(slot_id)))
            .await
    }

    async fn find_by_status(&self, status: BookingStatus) -> DomainResult<Vec<Booking>> {
        self.find_where(
            sea_orm::Condition::all().add(booking::Column::Status.eq(status.as_str())),
        )
        .await
    }

    async fn update_if_active(&self, b: &Booking) -> DomainResult<bool> {
        debug!(booking_id = b.id, "Conditional booking update");

        let result = booking::Entity::update_many()
            .set(domain_to_active(b)?)
            .filter(booking::Column::Id.eq(b.id))
            .filter(booking::Column::Status.eq(BookingStatus::Active.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected > 0 {
            return Ok(true);
        }

        let exists = booking::Entity::find_by_id(b.id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .is_some();
        if !exists {
            return Err(DomainError::not_found("Booking", "id", b.id));
        }
        Ok(false)
    }
}
