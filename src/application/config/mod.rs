pub mod auth;
pub mod backup;
pub mod database;
pub mod monitor;
pub mod server;
pub mod stock;

use once_cell::sync::Lazy;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server: server::ServerConfig,
    pub database: database::DatabaseConfig,
    pub auth: auth::AuthConfig,
    pub monitor: monitor::MonitorConfig,
    pub backup: backup::BackupConfig,
    pub stock: stock::StockConfig,

    // Build info
    pub commit_hash: String,
    pub build_time: String,
    pub version: String,

    // Logging
    pub log_level: String,
    /// `PRINTDESK_LOG_FORMAT=json` switches to one JSON object per line
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server: server::ServerConfig::from_env(),
            database: database::DatabaseConfig::from_env(),
            auth: auth::AuthConfig::from_env(),
            monitor: monitor::MonitorConfig::from_env(),
            backup: backup::BackupConfig::from_env(),
            stock: stock::StockConfig::from_env(),

            // Build info
            commit_hash: env::var("COMMIT_HASH").unwrap_or_else(|_| "unknown".to_string()),
            build_time: env::var("BUILD_TIME").unwrap_or_else(|_| "unknown".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            // Logging
            log_level: env::var("PRINTDESK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("PRINTDESK_LOG_FORMAT")
                .map(|v| is_json_format(&v))
                .unwrap_or(false),
        }
    }
}

fn is_json_format(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("json")
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format() {
        assert!(is_json_format("json"));
        assert!(is_json_format(" JSON "));
        assert!(!is_json_format("text"));
        assert!(!is_json_format(""));
    }
}
