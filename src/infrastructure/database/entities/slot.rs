//! Slot entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "slots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub number: String,
    pub available: bool,
    pub disabled: bool,

    #[sea_orm(nullable)]
    pub maintenance_notes: Option<String>,

    /// CAR, BIKE, TRUCK, EV (free text; empty = CAR)
    #[sea_orm(nullable)]
    pub slot_type: Option<String>,

    #[sea_orm(nullable)]
    pub location_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
