//! Create bookings table
//!
//! Fees are kept in cents. Status columns hold the upper-case names used by
//! the domain enums.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_slots::Slots;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookings::UserId).big_integer())
                    .col(ColumnDef::new(Bookings::SlotId).big_integer().not_null())
                    .col(ColumnDef::new(Bookings::VehicleType).string())
                    .col(
                        ColumnDef::new(Bookings::EntryTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::ExitTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(ColumnDef::new(Bookings::ParkingFeeCents).big_integer())
                    .col(ColumnDef::new(Bookings::PaymentStatus).string())
                    .col(ColumnDef::new(Bookings::TransactionId).string())
                    .col(ColumnDef::new(Bookings::PaymentTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(Bookings::PaymentMethod).string())
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_slot")
                            .from(Bookings::Table, Bookings::SlotId)
                            .to(Slots::Table, Slots::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_slot_status")
                    .table(Bookings::Table)
                    .col(Bookings::SlotId)
                    .col(Bookings::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_user")
                    .table(Bookings::Table)
                    .col(Bookings::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    UserId,
    SlotId,
    VehicleType,
    EntryTime,
    ExitTime,
    Status,
    ParkingFeeCents,
    PaymentStatus,
    TransactionId,
    PaymentTime,
    PaymentMethod,
    CreatedAt,
}
