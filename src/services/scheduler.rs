//! Periodic task scheduler
//!
//! A simple scheduler for running background tasks at regular intervals.
//! Add new tasks by implementing the `PeriodicTask` trait.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::backup;
use super::monitor::NetworkMonitor;
use crate::config::CONFIG;

/// Trait for periodic background tasks
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    /// Task name for logging
    fn name(&self) -> &'static str;

    /// How often to run (e.g., every 30 seconds)
    fn interval(&self) -> Duration;

    /// Delay before the first run. Defaults to one full interval.
    fn initial_delay(&self) -> Duration {
        self.interval()
    }

    /// Execute the task
    async fn run(&self, db: &DatabaseConnection) -> anyhow::Result<()>;
}

/// Start all periodic tasks
pub fn start_scheduler(db: Arc<DatabaseConnection>, monitor: NetworkMonitor) {
    let mut tasks: Vec<Box<dyn PeriodicTask>> = vec![Box::new(NetworkSweepTask {
        monitor,
        every: CONFIG.monitor.sweep_interval(),
    })];

    if !CONFIG.backup.enabled {
        tracing::info!("Daily database backup disabled");
    } else if CONFIG.database.sqlite_path().is_none() {
        tracing::info!("Database is not file-backed, skipping daily backup");
    } else {
        tasks.push(Box::new(DatabaseBackupTask {
            dir: CONFIG.backup.dir.clone(),
            at: CONFIG.backup.at,
        }));
    }

    for task in tasks {
        let db = db.clone();
        tokio::spawn(async move {
            run_task(task, db).await;
        });
    }

    tracing::info!("Periodic task scheduler started");
}

/// Run a single task on its interval
async fn run_task(task: Box<dyn PeriodicTask>, db: Arc<DatabaseConnection>) {
    let start = Instant::now() + task.initial_delay();
    let mut ticker = interval_at(start, task.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        tracing::debug!(task = task.name(), "Running periodic task");

        match task.run(&db).await {
            Ok(()) => {
                tracing::debug!(task = task.name(), "Periodic task completed");
            }
            Err(e) => {
                tracing::error!(task = task.name(), error = %e, "Periodic task failed");
            }
        }
    }
}

// ============================================================================
// Network Sweep Task
// ============================================================================

/// Probes every device and refreshes its reachability
pub struct NetworkSweepTask {
    pub monitor: NetworkMonitor,
    pub every: Duration,
}

#[async_trait]
impl PeriodicTask for NetworkSweepTask {
    fn name(&self) -> &'static str {
        "network_sweep"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    fn initial_delay(&self) -> Duration {
        // First sweep right at startup
        Duration::ZERO
    }

    async fn run(&self, _db: &DatabaseConnection) -> anyhow::Result<()> {
        self.monitor.sweep().await?;
        Ok(())
    }
}

// ============================================================================
// Database Backup Task
// ============================================================================

/// Writes a daily snapshot of the database
pub struct DatabaseBackupTask {
    pub dir: PathBuf,
    pub at: chrono::NaiveTime,
}

#[async_trait]
impl PeriodicTask for DatabaseBackupTask {
    fn name(&self) -> &'static str {
        "database_backup"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(24 * 60 * 60)
    }

    fn initial_delay(&self) -> Duration {
        backup::delay_until(chrono::Local::now(), self.at)
    }

    async fn run(&self, db: &DatabaseConnection) -> anyhow::Result<()> {
        backup::backup_database(db, &self.dir).await?;
        Ok(())
    }
}
