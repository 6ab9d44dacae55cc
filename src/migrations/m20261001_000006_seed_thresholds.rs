use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

use crate::config::CONFIG;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        use crate::models::prelude::*;
        use crate::services::ledger::Consumable;

        let db = manager.get_connection();

        if StockThreshold::find().count(db).await? > 0 {
            return Ok(());
        }

        let now = chrono::Utc::now();
        let defaults = [
            (Consumable::Labels, CONFIG.stock.labels_minimum),
            (Consumable::Ribbons, CONFIG.stock.ribbons_minimum),
        ];

        for (consumable, minimum) in defaults {
            stock_threshold::ActiveModel {
                consumable: Set(consumable.as_str().to_string()),
                minimum: Set(minimum.max(0)),
                updated_at: Set(now),
            }
            .insert(db)
            .await?;
        }

        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // Seeding is not reversible - thresholds may have been edited
        Ok(())
    }
}
