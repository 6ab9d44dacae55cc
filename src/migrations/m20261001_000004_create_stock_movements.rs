//! Migration: Create stock_movements table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMovements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::Date).string().not_null())
                    .col(ColumnDef::new(StockMovements::Month).string().not_null())
                    .col(ColumnDef::new(StockMovements::Kind).string().not_null())
                    .col(
                        ColumnDef::new(StockMovements::LabelIn)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(StockMovements::LabelOut)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(StockMovements::RibbonIn)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(StockMovements::RibbonOut)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(StockMovements::Note).string().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(StockMovements::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "stock_movements"]
enum StockMovements {
    Table,
    Id,
    #[iden = "created_at"]
    CreatedAt,
    Date,
    Month,
    Kind,
    #[iden = "label_in"]
    LabelIn,
    #[iden = "label_out"]
    LabelOut,
    #[iden = "ribbon_in"]
    RibbonIn,
    #[iden = "ribbon_out"]
    RibbonOut,
    Note,
}
