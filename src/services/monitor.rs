//! Printer reachability monitor
//!
//! A sweep walks every registered device, probes the ones that have an
//! address and writes back a derived status:
//!
//! - no answer (or probe error) → `Offline`
//! - answer slower than the unstable threshold → `Unstable`
//! - otherwise → `Online`
//!
//! Devices without an address are never probed and stay `Available`.
//! Sweeps are serialized; a sweep requested while one is running or queued
//! collapses into the queued one.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::sync::{mpsc, Mutex};

use crate::config::monitor::MonitorConfig;
use crate::models::device::{self, Reachability};
use crate::models::prelude::*;

/// Raw-print port answered by nearly every network label printer
pub const RAW_PRINT_PORT: u16 = 9100;

// ============================================================================
// Probing
// ============================================================================

/// Reachability check for a single address
#[async_trait]
pub trait Prober: Send + Sync {
    /// Round-trip time, or `None` when the host did not answer within `timeout`
    async fn probe(&self, address: &str, timeout: Duration) -> anyhow::Result<Option<Duration>>;
}

/// Probes with the system `ping`, falling back to a TCP connect on the
/// raw-print port when `ping` cannot be run.
#[derive(Debug, Default, Clone)]
pub struct SystemProber;

#[async_trait]
impl Prober for SystemProber {
    async fn probe(&self, address: &str, timeout: Duration) -> anyhow::Result<Option<Duration>> {
        validate_address(address)?;

        match ping(address, timeout).await {
            Ok(rtt) => Ok(rtt),
            Err(e) => {
                tracing::debug!(address, error = %e, "ping unavailable, trying TCP connect");
                tcp_connect(address, RAW_PRINT_PORT, timeout).await
            }
        }
    }
}

/// Addresses are passed straight to `ping`; refuse anything that could be
/// read as an option or that is not a host name or IP literal.
fn validate_address(address: &str) -> anyhow::Result<()> {
    let valid = !address.is_empty()
        && !address.starts_with('-')
        && address.len() <= 253
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_'));

    if valid {
        Ok(())
    } else {
        anyhow::bail!("invalid device address: {:?}", address)
    }
}

async fn ping(address: &str, timeout: Duration) -> anyhow::Result<Option<Duration>> {
    let mut cmd = Command::new("ping");
    if cfg!(windows) {
        cmd.args(["-n", "1", "-w", &timeout.as_millis().to_string(), address]);
    } else {
        let secs = timeout.as_secs().max(1).to_string();
        cmd.args(["-c", "1", "-W", &secs, address]);
    }
    cmd.kill_on_drop(true);

    let started = Instant::now();
    // The outer deadline covers platforms where -W is ignored
    let output = match tokio::time::timeout(timeout + Duration::from_millis(500), cmd.output()).await
    {
        Ok(output) => output?,
        Err(_) => return Ok(None),
    };
    let elapsed = started.elapsed();

    if !output.status.success() {
        // Exit status 2 and above means ping itself failed (permissions, bad usage)
        if output.status.code().is_some_and(|code| code >= 2) {
            anyhow::bail!(
                "ping exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        return Ok(None);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(Some(parse_ping_time(&stdout).unwrap_or(elapsed)))
}

/// Extract the round trip from `time=12.3 ms` / `time<1ms` in ping output
fn parse_ping_time(output: &str) -> Option<Duration> {
    let idx = output.find("time=").or_else(|| output.find("time<"))?;
    let rest = &output[idx + 5..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let ms: f64 = rest[..end].parse().ok()?;
    Some(Duration::from_micros((ms * 1000.0).round() as u64))
}

async fn tcp_connect(
    address: &str,
    port: u16,
    timeout: Duration,
) -> anyhow::Result<Option<Duration>> {
    let target = match address.parse::<std::net::IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port).to_string(),
        Err(_) => format!("{}:{}", address, port),
    };

    let started = Instant::now();
    match tokio::time::timeout(timeout, TcpStream::connect(&target)).await {
        Ok(Ok(_stream)) => Ok(Some(started.elapsed())),
        Ok(Err(_)) | Err(_) => Ok(None),
    }
}

/// Timing thresholds for one sweep
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub timeout: Duration,
    pub unstable_threshold: Duration,
}

impl From<&MonitorConfig> for ProbeSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            timeout: config.probe_timeout(),
            unstable_threshold: config.unstable_threshold(),
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

/// Map a probe result to a reachability status
pub fn classify(round_trip: Option<Duration>, unstable_threshold: Duration) -> Reachability {
    match round_trip {
        None => Reachability::Offline,
        Some(rtt) if rtt > unstable_threshold => Reachability::Unstable,
        Some(_) => Reachability::Online,
    }
}

// ============================================================================
// Device status store
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeTarget {
    pub id: i64,
    pub address: Option<String>,
    pub reachability: String,
}

/// Where a sweep reads devices from and writes statuses to
#[async_trait]
pub trait DeviceStatusStore: Send + Sync {
    async fn probe_targets(&self) -> anyhow::Result<Vec<ProbeTarget>>;

    /// Store `status` unless the device was deleted or re-addressed since
    /// `target` was read. Returns whether the write applied.
    async fn set_reachability(
        &self,
        target: &ProbeTarget,
        status: Reachability,
    ) -> anyhow::Result<bool>;
}

#[async_trait]
impl DeviceStatusStore for DatabaseConnection {
    async fn probe_targets(&self) -> anyhow::Result<Vec<ProbeTarget>> {
        let devices = Device::find()
            .order_by_asc(device::Column::Id)
            .all(self)
            .await?;

        Ok(devices
            .into_iter()
            .map(|d| ProbeTarget {
                id: d.id,
                address: d.address,
                reachability: d.reachability,
            })
            .collect())
    }

    async fn set_reachability(
        &self,
        target: &ProbeTarget,
        status: Reachability,
    ) -> anyhow::Result<bool> {
        // Status writes leave updated_at alone; it tracks operator edits
        let update = Device::update_many()
            .col_expr(device::Column::Reachability, Expr::value(status.as_str()))
            .filter(device::Column::Id.eq(target.id));

        let update = match target.address.as_deref() {
            Some(address) => update.filter(device::Column::Address.eq(address)),
            None => update.filter(device::Column::Address.is_null()),
        };

        let result = update.exec(self).await?;
        Ok(result.rows_affected > 0)
    }
}

// ============================================================================
// Sweeping
// ============================================================================

/// Outcome counts of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub probed: usize,
    pub online: usize,
    pub unstable: usize,
    pub offline: usize,
    pub available: usize,
    pub failed_writes: usize,
}

impl SweepReport {
    fn count(&mut self, status: Reachability) {
        match status {
            Reachability::Online => self.online += 1,
            Reachability::Unstable => self.unstable += 1,
            Reachability::Offline => self.offline += 1,
            Reachability::Available => self.available += 1,
            Reachability::Pending => {}
        }
    }
}

/// Probe every device once, sequentially, and store the derived statuses.
///
/// A failing probe or write only affects that device.
pub async fn sweep<S>(
    store: &S,
    prober: &dyn Prober,
    settings: ProbeSettings,
) -> anyhow::Result<SweepReport>
where
    S: DeviceStatusStore + ?Sized,
{
    let targets = store.probe_targets().await?;
    let mut report = SweepReport::default();

    for target in targets {
        let address = target
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());

        let status = match address {
            None => Reachability::Available,
            Some(address) => {
                report.probed += 1;
                let round_trip = match prober.probe(address, settings.timeout).await {
                    Ok(rtt) => rtt,
                    Err(e) => {
                        tracing::warn!(device_id = target.id, address, error = %e, "Probe failed");
                        None
                    }
                };
                classify(round_trip, settings.unstable_threshold)
            }
        };
        report.count(status);

        if target.reachability == status.as_str() {
            continue;
        }

        match store.set_reachability(&target, status).await {
            Ok(true) => {
                tracing::debug!(
                    device_id = target.id,
                    from = %target.reachability,
                    to = %status,
                    "Device reachability changed"
                );
            }
            Ok(false) => {
                tracing::debug!(device_id = target.id, "Device changed during sweep, result dropped");
            }
            Err(e) => {
                report.failed_writes += 1;
                tracing::warn!(device_id = target.id, error = %e, "Failed to store reachability");
            }
        }
    }

    tracing::info!(
        probed = report.probed,
        online = report.online,
        unstable = report.unstable,
        offline = report.offline,
        available = report.available,
        failed_writes = report.failed_writes,
        "Network sweep finished"
    );

    Ok(report)
}

/// Shared handle for running sweeps against the application database
#[derive(Clone)]
pub struct NetworkMonitor {
    db: DatabaseConnection,
    prober: Arc<dyn Prober>,
    settings: ProbeSettings,
    running: Arc<Mutex<()>>,
    trigger: mpsc::Sender<()>,
}

impl NetworkMonitor {
    /// Create the monitor and spawn the listener that serves sweep requests
    pub fn start(db: DatabaseConnection, prober: Arc<dyn Prober>, settings: ProbeSettings) -> Self {
        let (trigger, mut requests) = mpsc::channel::<()>(1);

        let monitor = Self {
            db,
            prober,
            settings,
            running: Arc::new(Mutex::new(())),
            trigger,
        };

        let worker = monitor.clone();
        tokio::spawn(async move {
            while requests.recv().await.is_some() {
                if let Err(e) = worker.sweep().await {
                    tracing::error!(error = %e, "Requested network sweep failed");
                }
            }
        });

        monitor
    }

    /// Run a sweep now, waiting for any sweep already in progress
    pub async fn sweep(&self) -> anyhow::Result<SweepReport> {
        let _guard = self.running.lock().await;
        sweep(&self.db, self.prober.as_ref(), self.settings).await
    }

    /// Queue a sweep without waiting for it. Returns false when one was already queued.
    pub fn request_sweep(&self) -> bool {
        match self.trigger.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => false,
            Err(mpsc::error::TrySendError::Closed(())) => {
                tracing::warn!("Sweep listener stopped, request dropped");
                false
            }
        }
    }

    pub fn settings(&self) -> ProbeSettings {
        self.settings
    }
}
