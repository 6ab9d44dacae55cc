use std::env;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for session tokens. `None` means a per-process secret is generated.
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: i64,
    pub admin_username: String,
    pub admin_password: Option<String>,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            jwt_secret: env::var("PRINTDESK_JWT_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            token_ttl_secs: env::var("PRINTDESK_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8 * 60 * 60),
            admin_username: env::var("PRINTDESK_ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("PRINTDESK_ADMIN_PASSWORD")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}
