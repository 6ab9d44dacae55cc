//! Daily database backups
//!
//! Snapshots are taken with `VACUUM INTO`, which produces a consistent copy
//! while the application keeps writing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeZone};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};

/// Snapshots kept in the backup directory; older ones are removed
pub const KEEP_BACKUPS: usize = 14;

const FILE_PREFIX: &str = "printdesk-";
const FILE_SUFFIX: &str = ".db";

/// Time left until the next occurrence of `at` (local wall clock)
pub fn delay_until(now: DateTime<Local>, at: NaiveTime) -> Duration {
    let today = now.date_naive().and_time(at);
    let mut next = Local
        .from_local_datetime(&today)
        .earliest()
        .unwrap_or(now);

    if next <= now {
        let tomorrow = today + chrono::Duration::days(1);
        next = Local
            .from_local_datetime(&tomorrow)
            .earliest()
            .unwrap_or(now + chrono::Duration::days(1));
    }

    (next - now).to_std().unwrap_or(Duration::ZERO)
}

fn backup_file_name(now: DateTime<Local>) -> String {
    format!("{}{}{}", FILE_PREFIX, now.format("%Y%m%d-%H%M%S"), FILE_SUFFIX)
}

/// Write a snapshot of the database into `dir` and prune old snapshots
pub async fn backup_database(db: &DatabaseConnection, dir: &Path) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let target = dir.join(backup_file_name(Local::now()));
    if tokio::fs::try_exists(&target).await? {
        anyhow::bail!("backup {} already exists", target.display());
    }

    // VACUUM INTO does not accept bound parameters
    let escaped = target.to_string_lossy().replace('\'', "''");
    db.execute(Statement::from_string(
        db.get_database_backend(),
        format!("VACUUM INTO '{}'", escaped),
    ))
    .await?;

    let removed = prune_backups(dir, KEEP_BACKUPS).await?;
    tracing::info!(path = %target.display(), pruned = removed, "Database backup written");

    Ok(target)
}

/// Delete all but the newest `keep` snapshots. Returns how many were removed.
pub async fn prune_backups(dir: &Path, keep: usize) -> anyhow::Result<usize> {
    let mut snapshots = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
            snapshots.push((name, entry.path()));
        }
    }

    // Timestamped names sort chronologically
    snapshots.sort();
    let excess = snapshots.len().saturating_sub(keep);

    for (_, path) in snapshots.iter().take(excess) {
        tokio::fs::remove_file(path).await?;
    }

    Ok(excess)
}
