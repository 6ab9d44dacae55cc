use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, parsed from `PRINTDESK_ALLOWED_ORIGINS` (comma-separated).
    /// When empty, any origin is allowed (dev convenience).
    pub allowed_origins: Vec<String>,
    /// Directory holding the prebuilt UI bundle
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let allowed_origins = env::var("PRINTDESK_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: env::var("PRINTDESK_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PRINTDESK_API_PORT")
                .or_else(|_| env::var("PORT"))
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(7860),
            allowed_origins,
            static_dir: PathBuf::from(
                env::var("PRINTDESK_STATIC_DIR").unwrap_or_else(|_| "./frontend/dist".to_string()),
            ),
        }
    }
}
