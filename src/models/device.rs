use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub model: String,
    #[sea_orm(unique)]
    pub address: Option<String>,
    #[sea_orm(unique)]
    pub serial: Option<String>,
    pub status: String,
    pub location: String,
    pub reachability: String,
    pub observation: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::device_event::Entity")]
    Events,
}

impl Related<super::device_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Derived network status of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reachability {
    /// Registered with an address, not probed yet
    Pending,
    Online,
    /// Answered, but slower than the unstable threshold
    Unstable,
    Offline,
    /// No address: spare or unracked device, never probed
    Available,
}

impl Reachability {
    pub const ALL: [Reachability; 5] = [
        Reachability::Pending,
        Reachability::Online,
        Reachability::Unstable,
        Reachability::Offline,
        Reachability::Available,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Reachability::Pending => "Pending",
            Reachability::Online => "Online",
            Reachability::Unstable => "Unstable",
            Reachability::Offline => "Offline",
            Reachability::Available => "Available",
        }
    }

    /// Initial status for a device with the given (already normalized) address
    pub fn initial_for(address: Option<&str>) -> Self {
        match address {
            Some(_) => Reachability::Pending,
            None => Reachability::Available,
        }
    }
}

impl std::fmt::Display for Reachability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Reachability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reachability::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown reachability status: {}", s))
    }
}
