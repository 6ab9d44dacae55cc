use std::env;
use std::time::Duration;

pub const MIN_SWEEP_INTERVAL_SECS: u64 = 10;
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 30;

/// Reachability monitor timing
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Seconds between sweeps (env: `PRINTDESK_SWEEP_INTERVAL_SECS`, clamped to 10..=30)
    pub sweep_interval_secs: u64,
    /// Per-probe deadline (env: `PRINTDESK_PROBE_TIMEOUT_MS`)
    pub probe_timeout_ms: u64,
    /// Round trips slower than this are reported as unstable (env: `PRINTDESK_UNSTABLE_THRESHOLD_MS`)
    pub unstable_threshold_ms: u64,
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        Self {
            sweep_interval_secs: env::var("PRINTDESK_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_SWEEP_INTERVAL_SECS)
                .clamp(MIN_SWEEP_INTERVAL_SECS, MAX_SWEEP_INTERVAL_SECS),
            probe_timeout_ms: env::var("PRINTDESK_PROBE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
            unstable_threshold_ms: env::var("PRINTDESK_UNSTABLE_THRESHOLD_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(150),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn unstable_threshold(&self) -> Duration {
        Duration::from_millis(self.unstable_threshold_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: MAX_SWEEP_INTERVAL_SECS,
            probe_timeout_ms: 2000,
            unstable_threshold_ms: 150,
        }
    }
}
