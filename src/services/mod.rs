pub mod accounts;
pub mod backup;
pub mod ledger;
pub mod monitor;
pub mod scheduler;
pub mod security;

pub use monitor::{NetworkMonitor, Prober, SystemProber};
pub use security::*;
