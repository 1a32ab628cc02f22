//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use super::db_err;
use crate::domain::{
    DomainError, DomainResult, NewUser, NewVehicle, User, UserRepository, Vehicle, VehicleType,
};
use crate::infrastructure::database::entities::{user, vehicle};

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn user_to_domain(m: user::Model) -> User {
    User {
        id: m.id,
        email: m.email,
        name: m.name,
        vehicle_type: m.vehicle_type.and_then(|v| v.parse().ok()),
        created_at: m.created_at,
    }
}

fn vehicle_to_domain(m: vehicle::Model) -> Vehicle {
    Vehicle {
        id: m.id,
        user_id: m.user_id,
        vehicle_type: m.vehicle_type.parse().unwrap_or(VehicleType::Car),
        plate: m.plate,
        is_default: m.is_default,
        created_at: m.created_at,
    }
}

// ── UserRepository impl ─────────────────────────────────────────

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, u: NewUser) -> DomainResult<User> {
        if self.find_by_email(&u.email).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "user with email {} already exists",
                u.email
            )));
        }
        debug!(email = %u.email, "Creating user");

        let model = user::ActiveModel {
            id: NotSet,
            email: Set(u.email),
            name: Set(u.name),
            vehicle_type: Set(u.vehicle_type.map(|v| v.as_str().to_string())),
            created_at: Set(Utc::now()),
        };
        let created = model.insert(&self.db).await.map_err(db_err)?;
        Ok(user_to_domain(created))
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(user_to_domain))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(Expr::expr(Func::lower(Expr::col(user::Column::Email))).eq(email.to_lowercase()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(user_to_domain))
    }

    async fn add_vehicle(&self, v: NewVehicle) -> DomainResult<Vehicle> {
        if self.find_by_id(v.user_id).await?.is_none() {
            return Err(DomainError::not_found("User", "id", v.user_id));
        }

        let model = vehicle::ActiveModel {
            id: NotSet,
            user_id: Set(v.user_id),
            vehicle_type: Set(v.vehicle_type.as_str().to_string()),
            plate: Set(v.plate),
            is_default: Set(v.is_default),
            created_at: Set(Utc::now()),
        };
        let created = model.insert(&self.db).await.map_err(db_err)?;
        Ok(vehicle_to_domain(created))
    }

    async fn vehicles_for_user(&self, user_id: i64) -> DomainResult<Vec<Vehicle>> {
        let models = vehicle::Entity::find()
            .filter(vehicle::Column::UserId.eq(user_id))
            .order_by_asc(vehicle::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(vehicle_to_domain).collect())
    }
}
