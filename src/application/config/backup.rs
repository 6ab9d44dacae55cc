use chrono::NaiveTime;
use std::env;
use std::path::PathBuf;

/// Daily database backup settings
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    /// Local wall-clock time of the daily copy (env: `PRINTDESK_BACKUP_TIME`, `HH:MM`)
    pub at: NaiveTime,
}

impl BackupConfig {
    pub fn from_env() -> Self {
        let default_at = NaiveTime::from_hms_opt(3, 0, 0).unwrap_or_default();

        Self {
            enabled: env::var("PRINTDESK_BACKUP_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            dir: PathBuf::from(
                env::var("PRINTDESK_BACKUP_DIR").unwrap_or_else(|_| "./backups".to_string()),
            ),
            at: env::var("PRINTDESK_BACKUP_TIME")
                .ok()
                .and_then(|v| NaiveTime::parse_from_str(v.trim(), "%H:%M").ok())
                .unwrap_or(default_at),
        }
    }
}
