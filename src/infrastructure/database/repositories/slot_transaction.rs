//! SeaORM implementation of SlotTransaction
//!
//! The in-process slot lock serialises callers within one engine; on
//! backends that support it the slot row is also locked `FOR UPDATE`.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::{booking_repository, db_err, slot_repository};
use crate::domain::{
    Booking, BookingStatus, BookingWindow, DomainError, DomainResult, Slot, SlotTransaction,
};
use crate::infrastructure::database::entities::{booking, slot};
use crate::infrastructure::storage::SlotLocks;

pub struct SeaOrmSlotTransaction {
    // Declared before the guard: the transaction rolls back before the
    // slot lock is released.
    txn: DatabaseTransaction,
    slot: Slot,
    _guard: OwnedMutexGuard<()>,
}

impl SeaOrmSlotTransaction {
    pub async fn begin(
        db: &DatabaseConnection,
        locks: &SlotLocks,
        slot_id: i64,
    ) -> DomainResult<Self> {
        let guard = locks.acquire(slot_id).await;
        let txn = db.begin().await.map_err(db_err)?;

        let mut query = slot::Entity::find_by_id(slot_id);
        if db.get_database_backend() != DbBackend::Sqlite {
            query = query.lock_exclusive();
        }
        let model = query
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Slot", "id", slot_id))?;

        Ok(Self {
            txn,
            slot: slot_repository::model_to_domain(model),
            _guard: guard,
        })
    }
}

#[async_trait]
impl SlotTransaction for SeaOrmSlotTransaction {
    fn slot(&self) -> &Slot {
        &self.slot
    }

    async fn has_active_conflict(&mut self, window: &BookingWindow) -> DomainResult<bool> {
        let active = booking::Entity::find()
            .filter(booking::Column::SlotId.eq(self.slot.id))
            .filter(booking::Column::Status.eq(BookingStatus::Active.as_str()))
            .all(&self.txn)
            .await
            .map_err(db_err)?;

        Ok(active
            .iter()
            .any(|b| window.overlaps(b.entry_time, b.exit_time)))
    }

    async fn find_booking(&mut self, id: i64) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find_by_id(id)
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(model.map(booking_repository::model_to_domain))
    }

    async fn insert_booking(&mut self, b: Booking) -> DomainResult<Booking> {
        let created = booking_repository::domain_to_active(&b)?
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(booking_repository::model_to_domain(created))
    }

    async fn update_booking(&mut self, b: Booking) -> DomainResult<()> {
        let exists = booking::Entity::find_by_id(b.id)
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .is_some();
        if !exists {
            return Err(DomainError::not_found("Booking", "id", b.id));
        }

        let mut model = booking_repository::domain_to_active(&b)?;
        model.id = Set(b.id);
        model.update(&self.txn).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_slot(&mut self, s: Slot) -> DomainResult<()> {
        if s.id != self.slot.id {
            return Err(DomainError::Storage(format!(
                "slot {} is not locked by this transaction (holding {})",
                s.id, self.slot.id
            )));
        }
        slot_repository::domain_to_active(&s)
            .update(&self.txn)
            .await
            .map_err(db_err)?;
        self.slot = s;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let this = *self;
        debug!(slot_id = this.slot.id, "Committing slot transaction");
        this.txn.commit().await.map_err(db_err)?;
        Ok(())
    }
}
