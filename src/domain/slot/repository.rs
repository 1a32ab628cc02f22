//! Slot repository interface
//!
//! Slot mutations go through [`SlotTransaction`](crate::domain::SlotTransaction),
//! which holds the exclusive lock on the record.

use async_trait::async_trait;

use super::model::{NewSlot, Slot};
use crate::domain::DomainResult;

#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// Create a slot, returning it with its assigned ID
    async fn create(&self, slot: NewSlot) -> DomainResult<Slot>;

    /// Find slot by ID (no lock)
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Slot>>;

    /// List slots, optionally restricted to one location
    async fn list(&self, location_id: Option<i64>) -> DomainResult<Vec<Slot>>;
}
