use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::models::{stock_movement, stock_threshold};
use crate::services::ledger::{Balance, NewMovement, Quantities};

/// Movement as entered in the UI form.
///
/// Either `labels`/`ribbons` (placed by kind) or the four explicit columns.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordMovement {
    #[validate(length(min = 1, max = 40))]
    pub kind: String,
    #[serde(default)]
    pub labels: Option<Value>,
    #[serde(default)]
    pub ribbons: Option<Value>,
    pub label_in: Option<Value>,
    pub label_out: Option<Value>,
    pub ribbon_in: Option<Value>,
    pub ribbon_out: Option<Value>,
    #[validate(length(max = 40))]
    pub date: Option<String>,
    #[validate(length(max = 20))]
    pub month: Option<String>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

impl RecordMovement {
    fn has_explicit_columns(&self) -> bool {
        self.label_in.is_some()
            || self.label_out.is_some()
            || self.ribbon_in.is_some()
            || self.ribbon_out.is_some()
    }

    pub fn into_movement(self) -> NewMovement {
        use crate::services::ledger::coerce_quantity;

        let qty = |v: &Option<Value>| v.as_ref().map(coerce_quantity).unwrap_or(0);

        let mut movement = if self.has_explicit_columns() {
            NewMovement {
                kind: self.kind.trim().to_string(),
                quantities: Quantities {
                    label_in: qty(&self.label_in),
                    label_out: qty(&self.label_out),
                    ribbon_in: qty(&self.ribbon_in),
                    ribbon_out: qty(&self.ribbon_out),
                },
                date: None,
                month: None,
                note: None,
            }
        } else {
            NewMovement::directional(&self.kind, qty(&self.labels), qty(&self.ribbons))
        };

        movement.date = self.date;
        movement.month = self.month;
        movement.note = self
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        movement
    }
}

/// Spreadsheet rows, either wrapped or as a bare array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImportRequest {
    Wrapped { movements: Vec<Value> },
    Bare(Vec<Value>),
}

impl ImportRequest {
    pub fn rows(&self) -> &[Value] {
        match self {
            ImportRequest::Wrapped { movements } => movements,
            ImportRequest::Bare(rows) => rows,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovementListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetThreshold {
    #[validate(range(min = 0, max = 10_000_000))]
    pub minimum: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementResponse {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub date: String,
    pub month: String,
    pub kind: String,
    pub label_in: i64,
    pub label_out: i64,
    pub ribbon_in: i64,
    pub ribbon_out: i64,
    pub note: Option<String>,
}

impl From<stock_movement::Model> for MovementResponse {
    fn from(m: stock_movement::Model) -> Self {
        Self {
            id: m.id,
            created_at: m.created_at,
            date: m.date,
            month: m.month,
            kind: m.kind,
            label_in: m.label_in,
            label_out: m.label_out,
            ribbon_in: m.ribbon_in,
            ribbon_out: m.ribbon_out,
            note: m.note,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementPage {
    pub items: Vec<MovementResponse>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockOverview {
    pub balances: Vec<Balance>,
    pub recent: Vec<MovementResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdResponse {
    pub consumable: String,
    pub minimum: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<stock_threshold::Model> for ThresholdResponse {
    fn from(t: stock_threshold::Model) -> Self {
        Self {
            consumable: t.consumable,
            minimum: t.minimum,
            updated_at: t.updated_at,
        }
    }
}
