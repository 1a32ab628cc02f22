//! User repository interface

use async_trait::async_trait;

use super::model::{NewUser, NewVehicle, User};
use crate::domain::vehicle::Vehicle;
use crate::domain::DomainResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> DomainResult<User>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<User>>;

    /// Resolve an authenticated principal (e-mail) to a user
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;

    async fn add_vehicle(&self, vehicle: NewVehicle) -> DomainResult<Vehicle>;

    /// Registered vehicles of a user, oldest first
    async fn vehicles_for_user(&self, user_id: i64) -> DomainResult<Vec<Vehicle>>;
}
