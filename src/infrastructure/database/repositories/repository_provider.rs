//! SeaORM implementation of RepositoryProvider

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::domain::audit::AuditRepository;
use crate::domain::booking::BookingRepository;
use crate::domain::repositories::{DomainResult, RepositoryProvider, SlotTransaction};
use crate::domain::slot::SlotRepository;
use crate::domain::user::UserRepository;
use crate::infrastructure::storage::SlotLocks;

use super::audit_repository::SeaOrmAuditRepository;
use super::booking_repository::SeaOrmBookingRepository;
use super::slot_repository::SeaOrmSlotRepository;
use super::slot_transaction::SeaOrmSlotTransaction;
use super::user_repository::SeaOrmUserRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let slot = repos.slots().find_by_id(7).await?;
/// let history = repos.bookings().find_by_user(3).await?;
/// ```
///
/// Code holding a [`SlotTransaction`] must not touch the other accessors
/// until it commits: with a single-connection SQLite pool that would wait
/// on the connection the transaction already owns.
pub struct SeaOrmRepositoryProvider {
    db: DatabaseConnection,
    locks: SlotLocks,
    slots: SeaOrmSlotRepository,
    bookings: SeaOrmBookingRepository,
    users: SeaOrmUserRepository,
    audit: SeaOrmAuditRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            locks: SlotLocks::new(),
            slots: SeaOrmSlotRepository::new(db.clone()),
            bookings: SeaOrmBookingRepository::new(db.clone()),
            users: SeaOrmUserRepository::new(db.clone()),
            audit: SeaOrmAuditRepository::new(db.clone()),
            db,
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn slots(&self) -> &dyn SlotRepository {
        &self.slots
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn audit_log(&self) -> &dyn AuditRepository {
        &self.audit
    }

    async fn begin_slot_transaction(
        &self,
        slot_id: i64,
    ) -> DomainResult<Box<dyn SlotTransaction>> {
        let tx = SeaOrmSlotTransaction::begin(&self.db, &self.locks, slot_id).await?;
        Ok(Box::new(tx))
    }
}
