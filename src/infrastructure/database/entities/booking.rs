//! Booking entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(nullable)]
    pub user_id: Option<i64>,

    pub slot_id: i64,

    #[sea_orm(nullable)]
    pub vehicle_type: Option<String>,

    pub entry_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub exit_time: Option<DateTimeUtc>,

    /// ACTIVE, COMPLETED, CANCELLED
    pub status: String,

    /// Fee in smallest currency unit
    #[sea_orm(nullable)]
    pub parking_fee_cents: Option<i64>,

    /// PENDING_PAYMENT, PAID, FAILED
    #[sea_orm(nullable)]
    pub payment_status: Option<String>,

    #[sea_orm(nullable)]
    pub transaction_id: Option<String>,

    #[sea_orm(nullable)]
    pub payment_time: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub payment_method: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::slot::Entity",
        from = "Column::SlotId",
        to = "super::slot::Column::Id"
    )]
    Slot,
}

impl Related<super::slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Slot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
