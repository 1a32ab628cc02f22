//! SeaORM implementation of SlotRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use super::db_err;
use crate::domain::{DomainResult, NewSlot, Slot, SlotRepository};
use crate::infrastructure::database::entities::slot;

pub struct SeaOrmSlotRepository {
    db: DatabaseConnection,
}

impl SeaOrmSlotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn model_to_domain(m: slot::Model) -> Slot {
    Slot {
        id: m.id,
        number: m.number,
        available: m.available,
        disabled: m.disabled,
        maintenance_notes: m.maintenance_notes,
        slot_type: m.slot_type,
        location_id: m.location_id,
    }
}

pub(super) fn domain_to_active(s: &Slot) -> slot::ActiveModel {
    slot::ActiveModel {
        id: Set(s.id),
        number: Set(s.number.clone()),
        available: Set(s.available),
        disabled: Set(s.disabled),
        maintenance_notes: Set(s.maintenance_notes.clone()),
        slot_type: Set(s.slot_type.clone()),
        location_id: Set(s.location_id),
    }
}

// ── SlotRepository impl ─────────────────────────────────────────

#[async_trait]
impl SlotRepository for SeaOrmSlotRepository {
    async fn create(&self, s: NewSlot) -> DomainResult<Slot> {
        debug!(number = %s.number, "Creating slot");

        let model = slot::ActiveModel {
            id: NotSet,
            number: Set(s.number),
            available: Set(true),
            disabled: Set(false),
            maintenance_notes: Set(None),
            slot_type: Set(s.slot_type),
            location_id: Set(s.location_id),
        };
        let created = model.insert(&self.db).await.map_err(db_err)?;
        Ok(model_to_domain(created))
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Slot>> {
        let model = slot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn list(&self, location_id: Option<i64>) -> DomainResult<Vec<Slot>> {
        let mut query = slot::Entity::find().order_by_asc(slot::Column::Id);
        if let Some(loc) = location_id {
            query = query.filter(slot::Column::LocationId.eq(loc));
        }
        let models = query.all(&self.db).await.map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
