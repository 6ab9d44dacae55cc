pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users;
mod m20261001_000002_create_devices;
mod m20261001_000003_create_device_events;
mod m20261001_000004_create_stock_movements;
mod m20261001_000005_create_stock_thresholds;
mod m20261001_000006_seed_thresholds;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users::Migration),
            Box::new(m20261001_000002_create_devices::Migration),
            Box::new(m20261001_000003_create_device_events::Migration),
            Box::new(m20261001_000004_create_stock_movements::Migration),
            Box::new(m20261001_000005_create_stock_thresholds::Migration),
            Box::new(m20261001_000006_seed_thresholds::Migration),
        ]
    }
}
