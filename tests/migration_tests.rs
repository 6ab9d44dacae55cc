//! Migration tests - apply, roll back and re-apply against in-memory SQLite

use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait, PaginatorTrait,
    Statement,
};
use sea_orm_migration::MigratorTrait;

use printdesk::migrations::Migrator;
use printdesk::models::prelude::*;

/// Fresh in-memory database without migrations
async fn create_sqlite_db() -> DatabaseConnection {
    Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create SQLite test database")
}

async fn get_table_names(db: &DatabaseConnection) -> Vec<String> {
    let rows = db
        .query_all(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' ORDER BY name"
                .to_string(),
        ))
        .await
        .unwrap();

    rows.iter()
        .map(|row| row.try_get::<String>("", "name").unwrap())
        .collect()
}

#[tokio::test]
async fn test_migrations_create_all_tables() {
    let db = create_sqlite_db().await;
    Migrator::up(&db, None).await.unwrap();

    let tables = get_table_names(&db).await;
    for table in [
        "users",
        "devices",
        "device_events",
        "stock_movements",
        "stock_thresholds",
        "seaql_migrations",
    ] {
        assert!(tables.contains(&table.to_string()), "missing table {}", table);
    }
}

#[tokio::test]
async fn test_thresholds_are_seeded_once() {
    let db = create_sqlite_db().await;
    Migrator::up(&db, None).await.unwrap();
    assert_eq!(StockThreshold::find().count(&db).await.unwrap(), 2);

    // Rolling back the seed keeps edited thresholds; re-applying must not duplicate them
    Migrator::down(&db, Some(1)).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    assert_eq!(StockThreshold::find().count(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn test_up_is_idempotent() {
    let db = create_sqlite_db().await;
    Migrator::up(&db, None).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let applied = Migrator::get_applied_migrations(&db).await.unwrap();
    assert_eq!(applied.len(), Migrator::migrations().len());
}

#[tokio::test]
async fn test_down_drops_everything() {
    let db = create_sqlite_db().await;
    Migrator::up(&db, None).await.unwrap();
    Migrator::down(&db, None).await.unwrap();

    let tables = get_table_names(&db).await;
    assert_eq!(tables, vec!["seaql_migrations".to_string()]);
}

#[tokio::test]
async fn test_device_address_is_unique() {
    let db = create_sqlite_db().await;
    Migrator::up(&db, None).await.unwrap();

    let insert = |address: &str| {
        Statement::from_string(
            DbBackend::Sqlite,
            format!(
                "INSERT INTO devices (model, address, status, location, reachability, created_at, updated_at) \
                 VALUES ('ZD220', '{}', 'In use', '', 'Pending', '2026-10-01T00:00:00Z', '2026-10-01T00:00:00Z')",
                address
            ),
        )
    };

    db.execute(insert("10.0.0.5")).await.unwrap();
    assert!(db.execute(insert("10.0.0.5")).await.is_err());
}
