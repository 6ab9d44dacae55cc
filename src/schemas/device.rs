use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::device::{self, Reachability};
use crate::models::device_event;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDevice {
    #[validate(length(min = 1, max = 120))]
    pub model: String,
    #[validate(length(max = 253))]
    pub address: Option<String>,
    #[validate(length(max = 120))]
    pub serial: Option<String>,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub status: String,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub location: String,
    #[validate(length(max = 2000))]
    pub observation: Option<String>,
}

/// Partial update. An empty `address` or `serial` clears the field.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDevice {
    #[validate(length(min = 1, max = 120))]
    pub model: Option<String>,
    #[validate(length(max = 253))]
    pub address: Option<String>,
    #[validate(length(max = 120))]
    pub serial: Option<String>,
    #[validate(length(max = 120))]
    pub status: Option<String>,
    #[validate(length(max = 120))]
    pub location: Option<String>,
    #[validate(length(max = 2000))]
    pub observation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceListParams {
    /// Case-insensitive match on model, address, serial or location
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceResponse {
    pub id: i64,
    pub model: String,
    pub address: Option<String>,
    pub serial: Option<String>,
    pub status: String,
    pub location: String,
    pub reachability: String,
    pub observation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<device::Model> for DeviceResponse {
    fn from(d: device::Model) -> Self {
        Self {
            id: d.id,
            model: d.model,
            address: d.address,
            serial: d.serial,
            status: d.status,
            location: d.location,
            reachability: d.reachability,
            observation: d.observation,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReachabilitySummary {
    pub total: u64,
    pub pending: u64,
    pub online: u64,
    pub unstable: u64,
    pub offline: u64,
    pub available: u64,
}

impl ReachabilitySummary {
    pub fn add(&mut self, status: &str) {
        self.total += 1;
        match status.parse::<Reachability>() {
            Ok(Reachability::Pending) => self.pending += 1,
            Ok(Reachability::Online) => self.online += 1,
            Ok(Reachability::Unstable) => self.unstable += 1,
            Ok(Reachability::Offline) => self.offline += 1,
            Ok(Reachability::Available) => self.available += 1,
            Err(_) => {}
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEvent {
    /// Display date; defaults to now
    #[validate(length(max = 40))]
    pub date: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateEvent {
    #[validate(length(min = 1, max = 40))]
    pub date: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    pub id: i64,
    pub device_id: i64,
    pub date: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<device_event::Model> for EventResponse {
    fn from(e: device_event::Model) -> Self {
        Self {
            id: e.id,
            device_id: e.device_id,
            date: e.date,
            description: e.description,
            created_at: e.created_at,
        }
    }
}
