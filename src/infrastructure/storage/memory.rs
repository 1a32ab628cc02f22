//! In-memory storage implementation

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::locks::SlotLocks;
use crate::domain::{
    AuditEntry, AuditRepository, Booking, BookingRepository, BookingStatus, BookingWindow,
    DomainError, DomainResult, NewSlot, NewUser, NewVehicle, RepositoryProvider, Slot,
    SlotRepository, SlotTransaction, User, UserRepository, Vehicle,
};

#[derive(Default)]
struct Tables {
    slots: DashMap<i64, Slot>,
    bookings: DashMap<i64, Booking>,
    users: DashMap<i64, User>,
    vehicles: DashMap<i64, Vehicle>,
    audit: DashMap<i64, AuditEntry>,
    slot_seq: AtomicI64,
    booking_seq: AtomicI64,
    user_seq: AtomicI64,
    vehicle_seq: AtomicI64,
    audit_seq: AtomicI64,
}

fn next_id(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

fn newest_first(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by(|a, b| b.entry_time.cmp(&a.entry_time).then(b.id.cmp(&a.id)));
    bookings
}

/// In-memory storage for development and testing
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<Tables>,
    locks: SlotLocks,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

// ── SlotRepository ──────────────────────────────────────────────

#[async_trait]
impl SlotRepository for InMemoryStorage {
    async fn create(&self, slot: NewSlot) -> DomainResult<Slot> {
        let slot = Slot {
            id: next_id(&self.tables.slot_seq),
            number: slot.number,
            available: true,
            disabled: false,
            maintenance_notes: None,
            slot_type: slot.slot_type,
            location_id: slot.location_id,
        };
        self.tables.slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Slot>> {
        Ok(self.tables.slots.get(&id).map(|s| s.clone()))
    }

    async fn list(&self, location_id: Option<i64>) -> DomainResult<Vec<Slot>> {
        let mut slots: Vec<Slot> = self
            .tables
            .slots
            .iter()
            .filter(|s| location_id.map_or(true, |loc| s.location_id == Some(loc)))
            .map(|s| s.clone())
            .collect();
        slots.sort_by_key(|s| s.id);
        Ok(slots)
    }
}

// ── BookingRepository ───────────────────────────────────────────

#[async_trait]
impl BookingRepository for InMemoryStorage {
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Booking>> {
        Ok(self.tables.bookings.get(&id).map(|b| b.clone()))
    }

    async fn find_by_user(&self, user_id: i64) -> DomainResult<Vec<Booking>> {
        Ok(newest_first(
            self.tables
                .bookings
                .iter()
                .filter(|b| b.user_id == Some(user_id))
                .map(|b| b.clone())
                .collect(),
        ))
    }

    async fn find_by_slot(&self, slot_id: i64) -> DomainResult<Vec<Booking>> {
        Ok(newest_first(
            self.tables
                .bookings
                .iter()
                .filter(|b| b.slot_id == slot_id)
                .map(|b| b.clone())
                .collect(),
        ))
    }

    async fn find_by_status(&self, status: BookingStatus) -> DomainResult<Vec<Booking>> {
        Ok(newest_first(
            self.tables
                .bookings
                .iter()
                .filter(|b| b.status == status)
                .map(|b| b.clone())
                .collect(),
        ))
    }

    async fn update_if_active(&self, booking: &Booking) -> DomainResult<bool> {
        let mut stored = self
            .tables
            .bookings
            .get_mut(&booking.id)
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking.id))?;

        if stored.status != BookingStatus::Active {
            return Ok(false);
        }
        *stored = booking.clone();
        Ok(true)
    }
}

// ── UserRepository ──────────────────────────────────────────────

#[async_trait]
impl UserRepository for InMemoryStorage {
    async fn create(&self, user: NewUser) -> DomainResult<User> {
        let email_taken = self
            .tables
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email));
        if email_taken {
            return Err(DomainError::Conflict(format!(
                "user with email {} already exists",
                user.email
            )));
        }

        let user = User {
            id: next_id(&self.tables.user_seq),
            email: user.email,
            name: user.name,
            vehicle_type: user.vehicle_type,
            created_at: Utc::now(),
        };
        self.tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<User>> {
        Ok(self.tables.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self
            .tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.clone()))
    }

    async fn add_vehicle(&self, vehicle: NewVehicle) -> DomainResult<Vehicle> {
        if !self.tables.users.contains_key(&vehicle.user_id) {
            return Err(DomainError::not_found("User", "id", vehicle.user_id));
        }
        let vehicle = Vehicle {
            id: next_id(&self.tables.vehicle_seq),
            user_id: vehicle.user_id,
            vehicle_type: vehicle.vehicle_type,
            plate: vehicle.plate,
            is_default: vehicle.is_default,
            created_at: Utc::now(),
        };
        self.tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn vehicles_for_user(&self, user_id: i64) -> DomainResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self
            .tables
            .vehicles
            .iter()
            .filter(|v| v.user_id == user_id)
            .map(|v| v.clone())
            .collect();
        vehicles.sort_by_key(|v| v.id);
        Ok(vehicles)
    }
}

// ── AuditRepository ─────────────────────────────────────────────

#[async_trait]
impl AuditRepository for InMemoryStorage {
    async fn record(&self, mut entry: AuditEntry) -> DomainResult<AuditEntry> {
        entry.id = next_id(&self.tables.audit_seq);
        self.tables.audit.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn find_for_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> DomainResult<Vec<AuditEntry>> {
        let mut entries: Vec<AuditEntry> = self
            .tables
            .audit
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .map(|e| e.clone())
            .collect();
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }
}

// ── Slot transaction ────────────────────────────────────────────

/// Writes are staged locally and applied on commit while the slot lock is
/// still held.
struct MemorySlotTransaction {
    tables: Arc<Tables>,
    slot: Slot,
    staged_slot: Option<Slot>,
    staged_bookings: Vec<Booking>,
    _guard: OwnedMutexGuard<()>,
}

impl MemorySlotTransaction {
    fn staged_booking(&self, id: i64) -> Option<&Booking> {
        self.staged_bookings.iter().find(|b| b.id == id)
    }

    /// Keep at most one staged version per booking.
    fn stage(&mut self, booking: Booking) {
        match self.staged_bookings.iter_mut().find(|b| b.id == booking.id) {
            Some(existing) => *existing = booking,
            None => self.staged_bookings.push(booking),
        }
    }
}

#[async_trait]
impl SlotTransaction for MemorySlotTransaction {
    fn slot(&self) -> &Slot {
        &self.slot
    }

    async fn has_active_conflict(&mut self, window: &BookingWindow) -> DomainResult<bool> {
        let slot_id = self.slot.id;
        let conflicts = |b: &Booking| {
            b.slot_id == slot_id
                && b.status == BookingStatus::Active
                && window.overlaps(b.entry_time, b.exit_time)
        };

        let committed = self
            .tables
            .bookings
            .iter()
            .filter(|b| self.staged_booking(b.id).is_none())
            .any(|b| conflicts(b.value()));

        Ok(committed || self.staged_bookings.iter().any(conflicts))
    }

    async fn find_booking(&mut self, id: i64) -> DomainResult<Option<Booking>> {
        if let Some(b) = self.staged_booking(id) {
            return Ok(Some(b.clone()));
        }
        Ok(self.tables.bookings.get(&id).map(|b| b.clone()))
    }

    async fn insert_booking(&mut self, mut booking: Booking) -> DomainResult<Booking> {
        booking.id = next_id(&self.tables.booking_seq);
        self.stage(booking.clone());
        Ok(booking)
    }

    async fn update_booking(&mut self, booking: Booking) -> DomainResult<()> {
        let known = self.staged_booking(booking.id).is_some()
            || self.tables.bookings.contains_key(&booking.id);
        if !known {
            return Err(DomainError::not_found("Booking", "id", booking.id));
        }
        self.stage(booking);
        Ok(())
    }

    async fn update_slot(&mut self, slot: Slot) -> DomainResult<()> {
        if slot.id != self.slot.id {
            return Err(DomainError::Storage(format!(
                "slot {} is not locked by this transaction (holding {})",
                slot.id, self.slot.id
            )));
        }
        self.staged_slot = Some(slot);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let this = *self;
        debug!(
            slot_id = this.slot.id,
            bookings = this.staged_bookings.len(),
            slot_changed = this.staged_slot.is_some(),
            "Committing slot transaction"
        );

        for booking in this.staged_bookings {
            this.tables.bookings.insert(booking.id, booking);
        }
        if let Some(slot) = this.staged_slot {
            this.tables.slots.insert(slot.id, slot);
        }
        // `_guard` drops here, releasing the slot.
        Ok(())
    }
}

// ── RepositoryProvider ──────────────────────────────────────────

#[async_trait]
impl RepositoryProvider for InMemoryStorage {
    fn slots(&self) -> &dyn SlotRepository {
        self
    }

    fn bookings(&self) -> &dyn BookingRepository {
        self
    }

    fn users(&self) -> &dyn UserRepository {
        self
    }

    fn audit_log(&self) -> &dyn AuditRepository {
        self
    }

    async fn begin_slot_transaction(
        &self,
        slot_id: i64,
    ) -> DomainResult<Box<dyn SlotTransaction>> {
        let guard = self.locks.acquire(slot_id).await;

        let slot = self
            .tables
            .slots
            .get(&slot_id)
            .map(|s| s.clone())
            .ok_or_else(|| DomainError::not_found("Slot", "id", slot_id))?;

        Ok(Box::new(MemorySlotTransaction {
            tables: Arc::clone(&self.tables),
            slot,
            staged_slot: None,
            staged_bookings: Vec::new(),
            _guard: guard,
        }))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VehicleType;
    use chrono::Duration;

    async fn storage_with_slot() -> (InMemoryStorage, Slot) {
        let storage = InMemoryStorage::new();
        let slot = storage
            .slots()
            .create(NewSlot {
                number: "A-1".into(),
                slot_type: Some("CAR".into()),
                location_id: Some(1),
            })
            .await
            .unwrap();
        (storage, slot)
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let (storage, slot) = storage_with_slot().await;

        {
            let mut tx = storage.begin_slot_transaction(slot.id).await.unwrap();
            let mut s = tx.slot().clone();
            s.occupy();
            tx.update_slot(s).await.unwrap();
            tx.insert_booking(Booking::new(None, slot.id, VehicleType::Car, Utc::now(), None))
                .await
                .unwrap();
            // dropped without commit
        }

        let stored = storage.slots().find_by_id(slot.id).await.unwrap().unwrap();
        assert!(stored.available);
        assert!(storage
            .bookings()
            .find_by_slot(slot.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn commit_applies_booking_and_slot_together() {
        let (storage, slot) = storage_with_slot().await;

        let mut tx = storage.begin_slot_transaction(slot.id).await.unwrap();
        let booking = tx
            .insert_booking(Booking::new(Some(1), slot.id, VehicleType::Car, Utc::now(), None))
            .await
            .unwrap();
        let mut s = tx.slot().clone();
        s.occupy();
        tx.update_slot(s).await.unwrap();
        tx.commit().await.unwrap();

        assert!(booking.id > 0);
        let stored = storage.bookings().find_by_id(booking.id).await.unwrap();
        assert_eq!(stored.map(|b| b.status), Some(BookingStatus::Active));
        let stored = storage.slots().find_by_id(slot.id).await.unwrap().unwrap();
        assert!(!stored.available);
    }

    #[tokio::test]
    async fn conflict_check_sees_staged_bookings() {
        let (storage, slot) = storage_with_slot().await;
        let t = Utc::now();

        let mut tx = storage.begin_slot_transaction(slot.id).await.unwrap();
        tx.insert_booking(Booking::new(None, slot.id, VehicleType::Car, t, None))
            .await
            .unwrap();
        let window = BookingWindow::for_request(t + Duration::minutes(30), None, Duration::hours(2));
        assert!(tx.has_active_conflict(&window).await.unwrap());
    }

    #[tokio::test]
    async fn update_if_active_refuses_terminal_bookings() {
        let (storage, slot) = storage_with_slot().await;

        let mut tx = storage.begin_slot_transaction(slot.id).await.unwrap();
        let mut booking = tx
            .insert_booking(Booking::new(None, slot.id, VehicleType::Car, Utc::now(), None))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        booking.exit_time = Some(Utc::now());
        assert!(storage.bookings().update_if_active(&booking).await.unwrap());

        let mut tx = storage.begin_slot_transaction(slot.id).await.unwrap();
        let mut cancelled = booking.clone();
        cancelled.cancel(Utc::now());
        tx.update_booking(cancelled).await.unwrap();
        tx.commit().await.unwrap();

        booking.exit_time = None;
        assert!(!storage.bookings().update_if_active(&booking).await.unwrap());
        let stored = storage.bookings().find_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn missing_slot_is_not_found() {
        let storage = InMemoryStorage::new();
        let err = storage.begin_slot_transaction(99).await.err().unwrap();
        assert!(matches!(err, DomainError::NotFound { entity: "Slot", .. }));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let storage = InMemoryStorage::new();
        let new_user = NewUser {
            email: "a@example.com".into(),
            name: "A".into(),
            vehicle_type: None,
        };
        storage.users().create(new_user.clone()).await.unwrap();
        let err = storage.users().create(new_user).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(storage
            .users()
            .find_by_email("A@EXAMPLE.COM")
            .await
            .unwrap()
            .is_some());
    }
}
