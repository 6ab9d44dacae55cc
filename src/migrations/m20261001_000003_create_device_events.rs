//! Migration: Create device_events table

use sea_orm_migration::prelude::*;

use super::m20261001_000002_create_devices::Devices;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeviceEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeviceEvents::DeviceId).big_integer().not_null())
                    .col(ColumnDef::new(DeviceEvents::Date).string().not_null())
                    .col(ColumnDef::new(DeviceEvents::Description).text().not_null())
                    .col(
                        ColumnDef::new(DeviceEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(DeviceEvents::Table, DeviceEvents::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_device_events_device_id")
                    .table(DeviceEvents::Table)
                    .col(DeviceEvents::DeviceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeviceEvents::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
#[iden = "device_events"]
enum DeviceEvents {
    Table,
    Id,
    #[iden = "device_id"]
    DeviceId,
    Date,
    Description,
    #[iden = "created_at"]
    CreatedAt,
}
