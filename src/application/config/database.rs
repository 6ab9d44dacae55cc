use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("PRINTDESK_DATABASE_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .unwrap_or_else(|_| "sqlite://./database.db?mode=rwc".to_string()),
        }
    }

    /// Path of the SQLite file behind the URL, if it points at one.
    ///
    /// Returns `None` for in-memory databases.
    pub fn sqlite_path(&self) -> Option<PathBuf> {
        sqlite_path_from_url(&self.database_url)
    }
}

pub(crate) fn sqlite_path_from_url(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}
