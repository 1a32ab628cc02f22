//! Audit repository interface

use async_trait::async_trait;

use super::model::AuditEntry;
use crate::domain::DomainResult;

#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Append an entry, returning it with its assigned ID
    async fn record(&self, entry: AuditEntry) -> DomainResult<AuditEntry>;

    /// Entries for one entity, oldest first
    async fn find_for_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> DomainResult<Vec<AuditEntry>>;
}
