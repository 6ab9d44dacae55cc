use std::env;

/// Initial consumable thresholds, applied only when the thresholds table is first seeded
#[derive(Debug, Clone)]
pub struct StockConfig {
    pub labels_minimum: i64,
    pub ribbons_minimum: i64,
}

impl StockConfig {
    pub fn from_env() -> Self {
        Self {
            labels_minimum: env::var("PRINTDESK_LABELS_MINIMUM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            ribbons_minimum: env::var("PRINTDESK_RIBBONS_MINIMUM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
        }
    }
}
