//! Slot administration: creation, listing and maintenance toggles

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::domain::{
    AuditAction, AuditEntry, DomainError, DomainResult, NewSlot, RepositoryProvider, Slot,
};

pub struct SlotMaintenanceService {
    repos: Arc<dyn RepositoryProvider>,
}

impl SlotMaintenanceService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub async fn add_slot(&self, slot: NewSlot) -> DomainResult<Slot> {
        if slot.number.trim().is_empty() {
            return Err(DomainError::InvalidInput("slot number is required".into()));
        }
        let slot = self.repos.slots().create(slot).await?;
        info!(slot_id = slot.id, number = %slot.number, "Slot added");
        Ok(slot)
    }

    /// Slots ordered by ID; `available_only` keeps reservable ones.
    pub async fn list_slots(
        &self,
        available_only: bool,
        location_id: Option<i64>,
    ) -> DomainResult<Vec<Slot>> {
        let slots = self.repos.slots().list(location_id).await?;
        Ok(slots
            .into_iter()
            .filter(|s| !available_only || s.is_reservable())
            .collect())
    }

    /// Take a slot out of service. Existing bookings are left alone.
    pub async fn disable_slot(
        &self,
        slot_id: i64,
        notes: Option<String>,
        actor: Option<i64>,
    ) -> DomainResult<Slot> {
        let (before, after) = self
            .toggle(slot_id, |slot| {
                slot.disabled = true;
                slot.maintenance_notes = notes;
            })
            .await?;
        self.audit(AuditAction::MaintenanceOn, &before, &after, actor)
            .await?;

        info!(slot_id, notes = ?after.maintenance_notes, "🔧 Slot under maintenance");
        Ok(after)
    }

    pub async fn enable_slot(&self, slot_id: i64, actor: Option<i64>) -> DomainResult<Slot> {
        let (before, after) = self
            .toggle(slot_id, |slot| {
                slot.disabled = false;
                slot.maintenance_notes = None;
            })
            .await?;
        self.audit(AuditAction::MaintenanceOff, &before, &after, actor)
            .await?;

        info!(slot_id, "🔧 Slot back in service");
        Ok(after)
    }

    async fn toggle(
        &self,
        slot_id: i64,
        change: impl FnOnce(&mut Slot),
    ) -> DomainResult<(Slot, Slot)> {
        let mut tx = self.repos.begin_slot_transaction(slot_id).await?;
        let before = tx.slot().clone();
        let mut after = before.clone();
        change(&mut after);
        tx.update_slot(after.clone()).await?;
        tx.commit().await?;
        Ok((before, after))
    }

    // Written after the slot transaction commits.
    async fn audit(
        &self,
        action: AuditAction,
        before: &Slot,
        after: &Slot,
        actor: Option<i64>,
    ) -> DomainResult<()> {
        let changes = json!({
            "before": { "disabled": before.disabled, "maintenance_notes": before.maintenance_notes },
            "after": { "disabled": after.disabled, "maintenance_notes": after.maintenance_notes },
        });
        self.repos
            .audit_log()
            .record(AuditEntry::new(action, "Slot", after.id, changes).by(actor))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryStorage;

    async fn service_with_slots() -> (Arc<InMemoryStorage>, SlotMaintenanceService) {
        let storage = Arc::new(InMemoryStorage::new());
        let service = SlotMaintenanceService::new(storage.clone());
        for (number, location) in [("A-1", Some(1)), ("A-2", Some(1)), ("B-1", Some(2))] {
            service
                .add_slot(NewSlot {
                    number: number.into(),
                    slot_type: Some("CAR".into()),
                    location_id: location,
                })
                .await
                .unwrap();
        }
        (storage, service)
    }

    #[tokio::test]
    async fn disable_and_enable_are_audited() {
        let (storage, service) = service_with_slots().await;

        let slot = service
            .disable_slot(1, Some("lighting".into()), Some(42))
            .await
            .unwrap();
        assert!(slot.disabled);
        assert_eq!(slot.maintenance_notes.as_deref(), Some("lighting"));

        let slot = service.enable_slot(1, None).await.unwrap();
        assert!(!slot.disabled);
        assert!(slot.maintenance_notes.is_none());

        let entries = storage.audit_log().find_for_entity("Slot", 1).await.unwrap();
        let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::MaintenanceOn, AuditAction::MaintenanceOff]);
        assert_eq!(entries[0].user_id, Some(42));
        assert_eq!(entries[0].changes["after"]["maintenance_notes"], "lighting");
    }

    #[tokio::test]
    async fn list_filters_by_location_and_reservability() {
        let (_storage, service) = service_with_slots().await;
        service.disable_slot(2, None, None).await.unwrap();

        assert_eq!(service.list_slots(false, None).await.unwrap().len(), 3);
        assert_eq!(service.list_slots(false, Some(1)).await.unwrap().len(), 2);

        let reservable = service.list_slots(true, Some(1)).await.unwrap();
        assert_eq!(reservable.len(), 1);
        assert_eq!(reservable[0].number, "A-1");
    }

    #[tokio::test]
    async fn unknown_slot_and_blank_number() {
        let (_storage, service) = service_with_slots().await;
        assert!(matches!(
            service.disable_slot(99, None, None).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            service.add_slot(NewSlot::default()).await,
            Err(DomainError::InvalidInput(_))
        ));
    }
}
