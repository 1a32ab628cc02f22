//! Booking repository interface

use async_trait::async_trait;

use super::model::{Booking, BookingStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Find booking by ID
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Booking>>;

    /// All bookings of a user, newest entry first
    async fn find_by_user(&self, user_id: i64) -> DomainResult<Vec<Booking>>;

    /// All bookings that ever referenced a slot, newest entry first
    async fn find_by_slot(&self, slot_id: i64) -> DomainResult<Vec<Booking>>;

    /// All bookings in a given status, newest entry first
    async fn find_by_status(&self, status: BookingStatus) -> DomainResult<Vec<Booking>>;

    /// Overwrite the booking only if the stored record is still ACTIVE.
    ///
    /// Returns `false` (and writes nothing) when the stored booking has left
    /// the ACTIVE state, e.g. because a concurrent cancel committed first.
    async fn update_if_active(&self, booking: &Booking) -> DomainResult<bool>;
}
