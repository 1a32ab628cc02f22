//! SeaORM implementation of AuditRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};

use super::db_err;
use crate::domain::{AuditAction, AuditEntry, AuditRepository, DomainError, DomainResult};
use crate::infrastructure::database::entities::audit_log;
use crate::shared::errors::InfraError;

pub struct SeaOrmAuditRepository {
    db: DatabaseConnection,
}

impl SeaOrmAuditRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: audit_log::Model) -> DomainResult<AuditEntry> {
    let action = AuditAction::parse(&m.action).ok_or_else(|| {
        DomainError::Storage(format!("unknown audit action '{}' in entry {}", m.action, m.id))
    })?;
    let changes = serde_json::from_str(&m.changes).map_err(InfraError::from)?;
    Ok(AuditEntry {
        id: m.id,
        user_id: m.user_id,
        action,
        entity_type: m.entity_type,
        entity_id: m.entity_id,
        changes,
        timestamp: m.timestamp,
    })
}

#[async_trait]
impl AuditRepository for SeaOrmAuditRepository {
    async fn record(&self, entry: AuditEntry) -> DomainResult<AuditEntry> {
        let model = audit_log::ActiveModel {
            id: NotSet,
            user_id: Set(entry.user_id),
            action: Set(entry.action.as_str().to_string()),
            entity_type: Set(entry.entity_type.clone()),
            entity_id: Set(entry.entity_id),
            changes: Set(serde_json::to_string(&entry.changes).map_err(InfraError::from)?),
            timestamp: Set(entry.timestamp),
        };
        let created = model.insert(&self.db).await.map_err(db_err)?;
        Ok(AuditEntry {
            id: created.id,
            ..entry
        })
    }

    async fn find_for_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> DomainResult<Vec<AuditEntry>> {
        let models = audit_log::Entity::find()
            .filter(audit_log::Column::EntityType.eq(entity_type))
            .filter(audit_log::Column::EntityId.eq(entity_id))
            .order_by_asc(audit_log::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }
}
