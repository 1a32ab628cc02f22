//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider`: unified access to all per-aggregate repositories
//! - `SlotTransaction`: exclusive, atomic unit of work on one slot
//! - `DomainResult`: standard result type for domain operations

use async_trait::async_trait;

use super::audit::AuditRepository;
use super::booking::{Booking, BookingRepository, BookingWindow};
use super::slot::{Slot, SlotRepository};
use super::user::UserRepository;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

// ── SlotTransaction ─────────────────────────────────────────────

/// Exclusive hold on a single slot record.
///
/// While a `SlotTransaction` is alive no other transaction can be opened on
/// the same slot. Writes made through it become visible together on
/// [`commit`](SlotTransaction::commit); dropping it without committing
/// discards them and releases the lock.
#[async_trait]
pub trait SlotTransaction: Send {
    /// The slot as read under the lock
    fn slot(&self) -> &Slot;

    /// Whether an ACTIVE booking on this slot overlaps `window`
    async fn has_active_conflict(&mut self, window: &BookingWindow) -> DomainResult<bool>;

    /// Read a booking inside the transaction
    async fn find_booking(&mut self, id: i64) -> DomainResult<Option<Booking>>;

    /// Stage a new booking, returning it with its assigned ID
    async fn insert_booking(&mut self, booking: Booking) -> DomainResult<Booking>;

    /// Stage an update of an existing booking
    async fn update_booking(&mut self, booking: Booking) -> DomainResult<()>;

    /// Stage an update of the locked slot
    async fn update_slot(&mut self, slot: Slot) -> DomainResult<()>;

    /// Apply all staged writes atomically and release the lock
    async fn commit(self: Box<Self>) -> DomainResult<()>;
}

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let booking = repos.bookings().find_by_id(42).await?;
///     let mut tx = repos.begin_slot_transaction(7).await?;
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    fn slots(&self) -> &dyn SlotRepository;
    fn bookings(&self) -> &dyn BookingRepository;
    fn users(&self) -> &dyn UserRepository;
    fn audit_log(&self) -> &dyn AuditRepository;

    /// Lock one slot for a validate-and-mutate unit.
    ///
    /// Waits while another transaction holds the same slot. Fails with
    /// `NotFound` when the slot does not exist.
    async fn begin_slot_transaction(&self, slot_id: i64)
        -> DomainResult<Box<dyn SlotTransaction>>;
}
