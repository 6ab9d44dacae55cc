use sea_orm::DatabaseConnection;

use crate::services::monitor::NetworkMonitor;

/// Database connection type alias
pub type DbConn = DatabaseConnection;

/// Application state containing all shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DbConn,
    pub monitor: NetworkMonitor,
}

impl AppState {
    pub fn new(db: DbConn, monitor: NetworkMonitor) -> Self {
        Self { db, monitor }
    }
}
