//! Stock ledger
//!
//! Movements of the two tracked consumables (labels and ribbons) are kept as
//! an append-only list of rows. The current balance is never stored: every
//! read sums `*_in - *_out` over the ledger, so edits and deletes of past rows
//! are reflected on the next read without any counter to keep in sync.

use std::collections::HashSet;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::models::{stock_movement, stock_threshold};

/// Display format used for generated movement and event dates
pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

const MONTH_FORMAT: &str = "%m/%Y";

/// Largest quantity a single movement column can hold
pub const MAX_QUANTITY: i64 = 1_000_000_000;

const IMPORT_NOTE: &str = "Imported from spreadsheet";

// ============================================================================
// Consumables and movement kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consumable {
    Labels,
    Ribbons,
}

impl Consumable {
    pub const ALL: [Consumable; 2] = [Consumable::Labels, Consumable::Ribbons];

    pub fn as_str(&self) -> &'static str {
        match self {
            Consumable::Labels => "labels",
            Consumable::Ribbons => "ribbons",
        }
    }
}

impl std::fmt::Display for Consumable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Consumable {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_token(s).as_str() {
            "labels" | "label" | "etiquetas" | "etiqueta" => Ok(Consumable::Labels),
            "ribbons" | "ribbon" => Ok(Consumable::Ribbons),
            _ => Err(AppError::BadRequest(format!("Unknown consumable: {}", s))),
        }
    }
}

/// Classification of a movement's free-text kind.
///
/// Only `Entry` and `Exit` steer where directional quantities land. The
/// stored kind string is always the caller's original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MovementKind {
    Entry,
    Exit,
    Adjustment,
    Manual,
    Imported,
    Unrecognized,
}

impl MovementKind {
    pub fn classify(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "entry" | "entrada" | "entradas" | "in" => MovementKind::Entry,
            "exit" | "saida" | "saidas" | "out" => MovementKind::Exit,
            "adjustment" | "ajuste" => MovementKind::Adjustment,
            "manual" => MovementKind::Manual,
            "imported" | "importado" | "import" | "importacao" => MovementKind::Imported,
            _ => MovementKind::Unrecognized,
        }
    }
}

/// Kinds that mark a row as carrying no movement at all (spreadsheet blanks
/// exported as text). Such rows never count towards a balance.
pub fn is_null_kind(raw: &str) -> bool {
    matches!(
        normalize_token(raw).as_str(),
        "" | "null" | "undefined" | "none" | "nan"
    )
}

// ============================================================================
// Quantities and balances
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantities {
    pub label_in: i64,
    pub label_out: i64,
    pub ribbon_in: i64,
    pub ribbon_out: i64,
}

impl Quantities {
    /// Place single label/ribbon quantities on the side selected by `kind`.
    ///
    /// Kinds other than entry and exit produce an all-zero effect.
    pub fn directional(kind: MovementKind, labels: i64, ribbons: i64) -> Self {
        let labels = labels.max(0);
        let ribbons = ribbons.max(0);
        match kind {
            MovementKind::Entry => Self {
                label_in: labels,
                ribbon_in: ribbons,
                ..Self::default()
            },
            MovementKind::Exit => Self {
                label_out: labels,
                ribbon_out: ribbons,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    fn clamped(self) -> Self {
        let bound = |q: i64| q.clamp(0, MAX_QUANTITY);
        Self {
            label_in: bound(self.label_in),
            label_out: bound(self.label_out),
            ribbon_in: bound(self.ribbon_in),
            ribbon_out: bound(self.ribbon_out),
        }
    }

    /// What a row of this kind may contribute: nothing for unrecognized
    /// kinds, the clamped columns otherwise
    pub fn effective(self, kind: MovementKind) -> Self {
        match kind {
            MovementKind::Unrecognized => Self::default(),
            _ => self.clamped(),
        }
    }

    fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Net quantity on hand per consumable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StockTotals {
    pub labels: i64,
    pub ribbons: i64,
}

impl StockTotals {
    pub fn get(&self, consumable: Consumable) -> i64 {
        match consumable {
            Consumable::Labels => self.labels,
            Consumable::Ribbons => self.ribbons,
        }
    }
}

/// Sum the ledger. Rows whose kind is a null marker are ignored.
pub fn derive_totals<'a, I>(rows: I) -> StockTotals
where
    I: IntoIterator<Item = &'a stock_movement::Model>,
{
    rows.into_iter()
        .filter(|row| !is_null_kind(&row.kind))
        .fold(StockTotals::default(), |acc, row| StockTotals {
            labels: acc
                .labels
                .saturating_add(row.label_in)
                .saturating_sub(row.label_out),
            ribbons: acc
                .ribbons
                .saturating_add(row.ribbon_in)
                .saturating_sub(row.ribbon_out),
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    pub consumable: Consumable,
    pub current: i64,
    pub minimum: i64,
    /// `round(current / minimum * 100)`; `None` when no minimum is configured
    pub percent: Option<i64>,
    pub below_minimum: bool,
}

impl Balance {
    pub fn new(consumable: Consumable, current: i64, minimum: i64) -> Self {
        let percent = (minimum > 0)
            .then(|| ((current as f64 / minimum as f64) * 100.0).round() as i64);

        Self {
            consumable,
            current,
            minimum,
            percent,
            below_minimum: current < minimum,
        }
    }
}

// ============================================================================
// Value coercion
// ============================================================================

/// Lowercase, strip Portuguese accents and collapse separators to `_`
pub fn normalize_token(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for c in raw.trim().to_lowercase().chars() {
        let c = match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        };

        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }

    out
}

/// Coerce a cell to a non-negative integer quantity.
///
/// Numbers are truncated, strings keep their leading integer (`"12 un"` is
/// 12), anything unparseable or negative becomes 0. Values are capped at
/// [`MAX_QUANTITY`].
pub fn coerce_quantity(value: &Value) -> i64 {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    };
    parsed.unwrap_or(0).clamp(0, MAX_QUANTITY)
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;

    Some(if negative { -value } else { value })
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Current local time in the display format
pub fn now_display() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

/// Derive a `mm/YYYY` label from a display date, falling back to the current month
pub fn month_label(date: &str) -> String {
    let date = date.trim();
    let parsed = ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y, %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(date, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            ["%d/%m/%Y", "%Y-%m-%d"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
        });

    match parsed {
        Some(d) => format!("{:02}/{}", d.month(), d.year()),
        None => Local::now().format(MONTH_FORMAT).to_string(),
    }
}

// ============================================================================
// Recording, editing and deleting movements
// ============================================================================

/// A movement ready to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub kind: String,
    pub quantities: Quantities,
    pub date: Option<String>,
    pub month: Option<String>,
    pub note: Option<String>,
}

impl NewMovement {
    /// Movement with single quantities steered by the kind
    pub fn directional(kind: &str, labels: i64, ribbons: i64) -> Self {
        Self {
            kind: kind.trim().to_string(),
            quantities: Quantities::directional(MovementKind::classify(kind), labels, ribbons),
            date: None,
            month: None,
            note: None,
        }
    }

    fn resolved_date(&self) -> String {
        self.date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(now_display)
    }

    fn dedup_key(&self, date: &str, month: &str) -> DedupKey {
        DedupKey {
            kind: self.kind.clone(),
            date: date.to_string(),
            month: month.to_string(),
            quantities: self.quantities,
        }
    }
}

/// Append a movement to the ledger
pub async fn record_movement(db: &DbConn, movement: NewMovement) -> Result<stock_movement::Model> {
    let date = movement.resolved_date();
    let month = movement
        .month
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| month_label(&date));

    insert_movement(db, &movement, date, month).await
}

async fn insert_movement(
    db: &DbConn,
    movement: &NewMovement,
    date: String,
    month: String,
) -> Result<stock_movement::Model> {
    let kind = MovementKind::classify(&movement.kind);
    let quantities = movement.quantities.effective(kind);

    if kind == MovementKind::Unrecognized {
        tracing::warn!(kind = %movement.kind, "Unrecognized movement kind, stored without stock effect");
    } else if quantities.is_zero() {
        tracing::debug!(kind = %movement.kind, "Recording movement with no stock effect");
    }

    let row = stock_movement::ActiveModel {
        created_at: Set(chrono::Utc::now()),
        date: Set(date),
        month: Set(month),
        kind: Set(movement.kind.clone()),
        label_in: Set(quantities.label_in),
        label_out: Set(quantities.label_out),
        ribbon_in: Set(quantities.ribbon_in),
        ribbon_out: Set(quantities.ribbon_out),
        note: Set(movement.note.clone()),
        ..Default::default()
    };

    Ok(row.insert(db).await?)
}

/// Partial correction of an existing movement
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementPatch {
    pub kind: Option<String>,
    pub date: Option<String>,
    pub month: Option<String>,
    pub note: Option<String>,
    /// Directional quantities, placed according to the (new or current) kind.
    /// Quantities accept the same loose input as a new movement.
    pub labels: Option<Value>,
    pub ribbons: Option<Value>,
    pub label_in: Option<Value>,
    pub label_out: Option<Value>,
    pub ribbon_in: Option<Value>,
    pub ribbon_out: Option<Value>,
}

/// Overwrite fields of a movement in place. Balances pick the change up on
/// the next read; nothing else is adjusted.
pub async fn update_movement(
    db: &DbConn,
    id: i64,
    patch: MovementPatch,
) -> Result<stock_movement::Model> {
    let existing = StockMovement::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movement {} not found", id)))?;

    let kind = patch
        .kind
        .as_deref()
        .map(str::trim)
        .unwrap_or(&existing.kind)
        .to_string();

    let mut quantities = Quantities {
        label_in: existing.label_in,
        label_out: existing.label_out,
        ribbon_in: existing.ribbon_in,
        ribbon_out: existing.ribbon_out,
    };

    let qty = |v: &Option<Value>| v.as_ref().map(coerce_quantity);
    let classified = MovementKind::classify(&kind);

    let explicit = patch.label_in.is_some()
        || patch.label_out.is_some()
        || patch.ribbon_in.is_some()
        || patch.ribbon_out.is_some();
    let reclassified = classified != MovementKind::classify(&existing.kind);

    // Re-place quantities when new amounts are given or the kind flips sides
    if patch.labels.is_some() || patch.ribbons.is_some() || (reclassified && !explicit) {
        let labels = qty(&patch.labels).unwrap_or(existing.label_in.max(existing.label_out));
        let ribbons = qty(&patch.ribbons).unwrap_or(existing.ribbon_in.max(existing.ribbon_out));
        quantities = Quantities::directional(classified, labels, ribbons);
    }

    if let Some(v) = qty(&patch.label_in) {
        quantities.label_in = v;
    }
    if let Some(v) = qty(&patch.label_out) {
        quantities.label_out = v;
    }
    if let Some(v) = qty(&patch.ribbon_in) {
        quantities.ribbon_in = v;
    }
    if let Some(v) = qty(&patch.ribbon_out) {
        quantities.ribbon_out = v;
    }
    let quantities = quantities.effective(classified);

    let mut active: stock_movement::ActiveModel = existing.into();
    active.kind = Set(kind);
    active.label_in = Set(quantities.label_in);
    active.label_out = Set(quantities.label_out);
    active.ribbon_in = Set(quantities.ribbon_in);
    active.ribbon_out = Set(quantities.ribbon_out);
    if let Some(date) = patch.date {
        active.date = Set(date.trim().to_string());
    }
    if let Some(month) = patch.month {
        active.month = Set(month.trim().to_string());
    }
    if let Some(note) = patch.note {
        let note = note.trim().to_string();
        active.note = Set((!note.is_empty()).then_some(note));
    }

    Ok(active.update(db).await?)
}

pub async fn delete_movement(db: &DbConn, id: i64) -> Result<()> {
    let result = StockMovement::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Movement {} not found", id)));
    }
    Ok(())
}

pub async fn get_movement(db: &DbConn, id: i64) -> Result<stock_movement::Model> {
    StockMovement::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movement {} not found", id)))
}

/// Page of movements, newest first, with the total row count
pub async fn list_movements(
    db: &DbConn,
    limit: u64,
    offset: u64,
) -> Result<(Vec<stock_movement::Model>, u64)> {
    let total = StockMovement::find().count(db).await?;
    let rows = StockMovement::find()
        .order_by_desc(stock_movement::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;
    Ok((rows, total))
}

// ============================================================================
// Balances and thresholds
// ============================================================================

/// Sum of the whole ledger. An empty ledger is zero stock.
pub async fn current_totals(db: &DbConn) -> Result<StockTotals> {
    let rows = StockMovement::find().all(db).await?;
    Ok(derive_totals(&rows))
}

pub async fn threshold_for(db: &DbConn, consumable: Consumable) -> Result<i64> {
    let minimum = StockThreshold::find_by_id(consumable.as_str().to_string())
        .one(db)
        .await?
        .map(|t| t.minimum)
        .unwrap_or(0);
    Ok(minimum)
}

pub async fn current_balance(db: &DbConn, consumable: Consumable) -> Result<Balance> {
    let totals = current_totals(db).await?;
    let minimum = threshold_for(db, consumable).await?;
    Ok(Balance::new(consumable, totals.get(consumable), minimum))
}

/// Balances of every consumable from a single ledger scan
pub async fn all_balances(db: &DbConn) -> Result<Vec<Balance>> {
    let totals = current_totals(db).await?;
    let mut balances = Vec::with_capacity(Consumable::ALL.len());
    for consumable in Consumable::ALL {
        let minimum = threshold_for(db, consumable).await?;
        balances.push(Balance::new(consumable, totals.get(consumable), minimum));
    }
    Ok(balances)
}

pub async fn list_thresholds(db: &DbConn) -> Result<Vec<stock_threshold::Model>> {
    Ok(StockThreshold::find()
        .order_by_asc(stock_threshold::Column::Consumable)
        .all(db)
        .await?)
}

pub async fn set_threshold(
    db: &DbConn,
    consumable: Consumable,
    minimum: i64,
) -> Result<stock_threshold::Model> {
    let now = chrono::Utc::now();
    let minimum = minimum.max(0);

    let existing = StockThreshold::find_by_id(consumable.as_str().to_string())
        .one(db)
        .await?;

    let saved = match existing {
        Some(model) => {
            let mut active: stock_threshold::ActiveModel = model.into();
            active.minimum = Set(minimum);
            active.updated_at = Set(now);
            active.update(db).await?
        }
        None => {
            stock_threshold::ActiveModel {
                consumable: Set(consumable.as_str().to_string()),
                minimum: Set(minimum),
                updated_at: Set(now),
            }
            .insert(db)
            .await?
        }
    };

    Ok(saved)
}

// ============================================================================
// Batch import
// ============================================================================

const KIND_KEYS: &[&str] = &["tipo", "type", "kind", "movimento", "movimentacao", "movement"];
const LABEL_KEYS: &[&str] = &["etiquetas", "etiqueta", "labels", "label", "etiquetas_qtd", "qtd_etiquetas", "label_qty"];
const RIBBON_KEYS: &[&str] = &["ribbons", "ribbon", "ribbons_qtd", "qtd_ribbons", "ribbon_qty"];
const LABEL_IN_KEYS: &[&str] = &["entrada_etiquetas", "etiquetas_entrada", "entrada_de_etiquetas", "label_in", "labels_in"];
const LABEL_OUT_KEYS: &[&str] = &["saida_etiquetas", "etiquetas_saida", "saida_de_etiquetas", "label_out", "labels_out"];
const RIBBON_IN_KEYS: &[&str] = &["entrada_ribbons", "ribbons_entrada", "entrada_de_ribbons", "ribbon_in", "ribbons_in"];
const RIBBON_OUT_KEYS: &[&str] = &["saida_ribbons", "ribbons_saida", "saida_de_ribbons", "ribbon_out", "ribbons_out"];
const DATE_KEYS: &[&str] = &["data", "date", "dia"];
const MONTH_KEYS: &[&str] = &["mes", "month", "mes_referencia"];
const NOTE_KEYS: &[&str] = &["obs", "observacao", "observacoes", "note", "notes"];

/// Cell values that mark spreadsheet header or total rows
const SENTINEL_CELLS: &[&str] = &[
    "total", "totais", "total_geral", "subtotal", "tipo", "type", "kind", "data", "date", "mes",
    "month",
];

/// What a single spreadsheet row turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Movement(NewMovement),
    /// Header, total or null-kind row
    Sentinel(String),
    Malformed(String),
}

struct Row<'a> {
    cells: Vec<(String, &'a Value)>,
}

impl<'a> Row<'a> {
    fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            cells: object
                .iter()
                .map(|(k, v)| (normalize_token(k), v))
                .collect(),
        }
    }

    fn get(&self, aliases: &[&str]) -> Option<&'a Value> {
        aliases.iter().find_map(|alias| {
            self.cells
                .iter()
                .find(|(key, value)| key == alias && !value.is_null())
                .map(|(_, value)| *value)
        })
    }

    fn text(&self, aliases: &[&str]) -> Option<String> {
        self.get(aliases).and_then(cell_text)
    }

    fn quantity(&self, aliases: &[&str]) -> i64 {
        self.get(aliases).map(coerce_quantity).unwrap_or(0)
    }

    fn has_any(&self, aliases: &[&str]) -> bool {
        self.get(aliases).is_some()
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| cell_text(v).is_none())
    }
}

fn is_sentinel_cell(text: &str) -> bool {
    SENTINEL_CELLS.contains(&normalize_token(text).as_str())
}

/// Interpret one already-parsed spreadsheet row
pub fn parse_import_row(value: &Value) -> RowOutcome {
    let object = match value {
        Value::Object(object) => object,
        Value::Null => return RowOutcome::Malformed("empty row".to_string()),
        other => {
            return RowOutcome::Malformed(format!("expected an object, got {}", json_type(other)))
        }
    };

    let row = Row::new(object);
    if row.is_blank() {
        return RowOutcome::Malformed("empty row".to_string());
    }

    let kind = row.text(KIND_KEYS);
    let date = row.text(DATE_KEYS);
    let month = row.text(MONTH_KEYS);

    for cell in [&kind, &date, &month].into_iter().flatten() {
        if is_sentinel_cell(cell) {
            return RowOutcome::Sentinel(format!("header or total row ({})", cell));
        }
    }
    if let Some(kind) = &kind {
        if is_null_kind(kind) {
            return RowOutcome::Sentinel(format!("null movement kind ({})", kind));
        }
    }

    let explicit = [LABEL_IN_KEYS, LABEL_OUT_KEYS, RIBBON_IN_KEYS, RIBBON_OUT_KEYS]
        .iter()
        .any(|keys| row.has_any(keys));

    let (kind, quantities) = if explicit {
        let kind = kind.unwrap_or_else(|| "Imported".to_string());
        let quantities = Quantities {
            label_in: row.quantity(LABEL_IN_KEYS),
            label_out: row.quantity(LABEL_OUT_KEYS),
            ribbon_in: row.quantity(RIBBON_IN_KEYS),
            ribbon_out: row.quantity(RIBBON_OUT_KEYS),
        };
        (kind, quantities)
    } else {
        let kind = kind.unwrap_or_else(|| "Entry".to_string());
        let quantities = Quantities::directional(
            MovementKind::classify(&kind),
            row.quantity(LABEL_KEYS),
            row.quantity(RIBBON_KEYS),
        );
        (kind, quantities)
    };

    RowOutcome::Movement(NewMovement {
        kind,
        quantities,
        date,
        month,
        note: Some(row.text(NOTE_KEYS).unwrap_or_else(|| IMPORT_NOTE.to_string())),
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    kind: String,
    date: String,
    month: String,
    quantities: Quantities,
}

impl From<&stock_movement::Model> for DedupKey {
    fn from(row: &stock_movement::Model) -> Self {
        Self {
            kind: row.kind.clone(),
            date: row.date.clone(),
            month: row.month.clone(),
            quantities: Quantities {
                label_in: row.label_in,
                label_out: row.label_out,
                ribbon_in: row.ribbon_in,
                ribbon_out: row.ribbon_out,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// Zero-based position in the submitted batch
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub skipped_rows: Vec<SkippedRow>,
}

impl ImportReport {
    fn skip(&mut self, row: usize, reason: String) {
        self.skipped += 1;
        self.skipped_rows.push(SkippedRow { row, reason });
    }
}

/// Import already-parsed spreadsheet rows.
///
/// Rows identical to an existing ledger row (or to an earlier row of the same
/// batch) on kind, date, month and all four quantities are counted as
/// duplicates and not inserted. A failing row never stops the batch.
pub async fn import_batch(db: &DbConn, rows: &[Value]) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    let existing = StockMovement::find().all(db).await?;
    let mut seen: HashSet<DedupKey> = existing.iter().map(DedupKey::from).collect();

    for (index, value) in rows.iter().enumerate() {
        let movement = match parse_import_row(value) {
            RowOutcome::Movement(movement) => movement,
            RowOutcome::Sentinel(reason) | RowOutcome::Malformed(reason) => {
                tracing::debug!(row = index, reason = %reason, "Skipping import row");
                report.skip(index, reason);
                continue;
            }
        };

        let date = movement.resolved_date();
        let month = movement
            .month
            .clone()
            .unwrap_or_else(|| month_label(&date));
        let movement = NewMovement {
            quantities: movement
                .quantities
                .effective(MovementKind::classify(&movement.kind)),
            ..movement
        };

        // Generated dates are unique per second, so only caller-supplied dates dedupe
        if movement.date.is_some() && !seen.insert(movement.dedup_key(&date, &month)) {
            report.duplicates += 1;
            continue;
        }

        match insert_movement(db, &movement, date, month).await {
            Ok(_) => report.imported += 1,
            Err(e) => {
                tracing::warn!(row = index, error = %e, "Failed to store import row");
                report.skip(index, "could not be stored".to_string());
            }
        }
    }

    tracing::info!(
        imported = report.imported,
        skipped = report.skipped,
        duplicates = report.duplicates,
        "Stock import finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(kind: &str, q: Quantities) -> stock_movement::Model {
        stock_movement::Model {
            id: 0,
            created_at: chrono::Utc::now(),
            date: "01/10/2026 08:00:00".to_string(),
            month: "10/2026".to_string(),
            kind: kind.to_string(),
            label_in: q.label_in,
            label_out: q.label_out,
            ribbon_in: q.ribbon_in,
            ribbon_out: q.ribbon_out,
            note: None,
        }
    }

    #[test]
    fn test_classify_accepts_both_languages() {
        assert_eq!(MovementKind::classify("Entrada"), MovementKind::Entry);
        assert_eq!(MovementKind::classify("ENTRY"), MovementKind::Entry);
        assert_eq!(MovementKind::classify("Saída"), MovementKind::Exit);
        assert_eq!(MovementKind::classify("saida"), MovementKind::Exit);
        assert_eq!(MovementKind::classify("exit"), MovementKind::Exit);
        assert_eq!(MovementKind::classify("Ajuste"), MovementKind::Adjustment);
        assert_eq!(MovementKind::classify("Importado"), MovementKind::Imported);
        assert_eq!(MovementKind::classify("transfer"), MovementKind::Unrecognized);
    }

    #[test]
    fn test_directional_quantities() {
        let entry = Quantities::directional(MovementKind::Entry, 100, 10);
        assert_eq!((entry.label_in, entry.ribbon_in), (100, 10));
        assert_eq!((entry.label_out, entry.ribbon_out), (0, 0));

        let exit = Quantities::directional(MovementKind::Exit, 30, 5);
        assert_eq!((exit.label_out, exit.ribbon_out), (30, 5));

        let unknown = Quantities::directional(MovementKind::Unrecognized, 30, 5);
        assert_eq!(unknown, Quantities::default());
    }

    #[test]
    fn test_derive_totals_entry_then_exit() {
        let rows = vec![
            row("Entry", Quantities::directional(MovementKind::Entry, 100, 10)),
            row("Exit", Quantities::directional(MovementKind::Exit, 30, 5)),
        ];
        let totals = derive_totals(&rows);
        assert_eq!(totals, StockTotals { labels: 70, ribbons: 5 });
    }

    #[test]
    fn test_derive_totals_is_order_independent() {
        let entry = Quantities::directional(MovementKind::Entry, 7, 3);
        let exit = Quantities::directional(MovementKind::Exit, 2, 1);

        let mut rows: Vec<_> = (0..5)
            .map(|_| row("Entry", entry))
            .chain((0..4).map(|_| row("Exit", exit)))
            .collect();
        let forward = derive_totals(&rows);
        rows.reverse();
        let backward = derive_totals(&rows);

        assert_eq!(forward, StockTotals { labels: 5 * 7 - 4 * 2, ribbons: 5 * 3 - 4 });
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_derive_totals_ignores_null_kind_rows() {
        let rows = vec![
            row("Entrada", Quantities::directional(MovementKind::Entry, 50, 5)),
            row("null", Quantities { label_in: 999, ..Quantities::default() }),
            row("", Quantities { ribbon_out: 999, ..Quantities::default() }),
        ];
        assert_eq!(derive_totals(&rows), StockTotals { labels: 50, ribbons: 5 });
    }

    #[test]
    fn test_derive_totals_empty_ledger() {
        let rows: Vec<stock_movement::Model> = Vec::new();
        assert_eq!(derive_totals(&rows), StockTotals::default());
    }

    #[test]
    fn test_balance_percent() {
        let balance = Balance::new(Consumable::Labels, 70, 200);
        assert_eq!(balance.percent, Some(35));
        assert!(balance.below_minimum);

        let healthy = Balance::new(Consumable::Ribbons, 5, 3);
        assert_eq!(healthy.percent, Some(167));
        assert!(!healthy.below_minimum);

        let unset = Balance::new(Consumable::Ribbons, 5, 0);
        assert_eq!(unset.percent, None);
    }

    #[test]
    fn test_coerce_quantity() {
        assert_eq!(coerce_quantity(&json!(12)), 12);
        assert_eq!(coerce_quantity(&json!(12.9)), 12);
        assert_eq!(coerce_quantity(&json!("15")), 15);
        assert_eq!(coerce_quantity(&json!(" 20 un")), 20);
        assert_eq!(coerce_quantity(&json!("abc")), 0);
        assert_eq!(coerce_quantity(&json!(-4)), 0);
        assert_eq!(coerce_quantity(&json!("-4")), 0);
        assert_eq!(coerce_quantity(&json!(null)), 0);
        assert_eq!(coerce_quantity(&json!(true)), 0);
    }

    #[test]
    fn test_coerce_quantity_is_capped() {
        assert_eq!(coerce_quantity(&json!(i64::MAX)), MAX_QUANTITY);
        assert_eq!(coerce_quantity(&json!(1e300)), MAX_QUANTITY);
        assert_eq!(coerce_quantity(&json!("99999999999999999")), MAX_QUANTITY);
    }

    #[test]
    fn test_derive_totals_saturates() {
        let huge = Quantities { label_in: i64::MAX, ..Quantities::default() };
        let rows = vec![row("Entry", huge), row("Entry", huge)];
        assert_eq!(derive_totals(&rows).labels, i64::MAX);
    }

    #[test]
    fn test_unrecognized_kind_has_no_effect() {
        let given = Quantities { label_in: 50, ribbon_out: 2, ..Quantities::default() };
        assert_eq!(given.effective(MovementKind::Unrecognized), Quantities::default());
        assert_eq!(given.effective(MovementKind::Adjustment), given);

        let oversized = Quantities { label_in: i64::MAX, ..Quantities::default() };
        assert_eq!(oversized.effective(MovementKind::Entry).label_in, MAX_QUANTITY);
    }

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token("Saída Etiquetas"), "saida_etiquetas");
        assert_eq!(normalize_token("  MÊS  "), "mes");
        assert_eq!(normalize_token("Observação"), "observacao");
        assert_eq!(normalize_token("entrada-de ribbons"), "entrada_de_ribbons");
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label("18/10/2026 14:03:00"), "10/2026");
        assert_eq!(month_label("18/10/2026, 14:03:00"), "10/2026");
        assert_eq!(month_label("2026-03-02"), "03/2026");
    }

    #[test]
    fn test_parse_simple_row() {
        let outcome = parse_import_row(&json!({
            "Tipo": "Saída",
            "Etiquetas": "30",
            "Ribbons": 5,
            "Data": "02/10/2026"
        }));

        match outcome {
            RowOutcome::Movement(m) => {
                assert_eq!(m.kind, "Saída");
                assert_eq!(m.quantities.label_out, 30);
                assert_eq!(m.quantities.ribbon_out, 5);
                assert_eq!(m.date.as_deref(), Some("02/10/2026"));
                assert_eq!(m.note.as_deref(), Some(IMPORT_NOTE));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_parse_monthly_row_with_explicit_columns() {
        let outcome = parse_import_row(&json!({
            "Mês": "09/2026",
            "Entrada Etiquetas": 500,
            "Saída Etiquetas": 120,
            "Entrada Ribbons": 20
        }));

        match outcome {
            RowOutcome::Movement(m) => {
                assert_eq!(m.kind, "Imported");
                assert_eq!(m.month.as_deref(), Some("09/2026"));
                assert_eq!(
                    m.quantities,
                    Quantities { label_in: 500, label_out: 120, ribbon_in: 20, ribbon_out: 0 }
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_kind_defaults_to_entry() {
        match parse_import_row(&json!({ "etiquetas": 10 })) {
            RowOutcome::Movement(m) => {
                assert_eq!(m.kind, "Entry");
                assert_eq!(m.quantities.label_in, 10);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_parse_bad_number_is_zero() {
        match parse_import_row(&json!({ "Tipo": "Entrada", "Etiquetas": "muitas" })) {
            RowOutcome::Movement(m) => assert_eq!(m.quantities, Quantities::default()),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_parse_sentinel_rows() {
        assert!(matches!(
            parse_import_row(&json!({ "Tipo": "TOTAL", "Etiquetas": 900 })),
            RowOutcome::Sentinel(_)
        ));
        assert!(matches!(
            parse_import_row(&json!({ "Tipo": "Tipo", "Etiquetas": "Etiquetas" })),
            RowOutcome::Sentinel(_)
        ));
        assert!(matches!(
            parse_import_row(&json!({ "Tipo": "null", "Etiquetas": 1 })),
            RowOutcome::Sentinel(_)
        ));
        assert!(matches!(
            parse_import_row(&json!({ "Mês": "Total", "Entrada Etiquetas": 1 })),
            RowOutcome::Sentinel(_)
        ));
    }

    #[test]
    fn test_parse_malformed_rows() {
        assert!(matches!(parse_import_row(&json!("oops")), RowOutcome::Malformed(_)));
        assert!(matches!(parse_import_row(&json!([1, 2])), RowOutcome::Malformed(_)));
        assert!(matches!(parse_import_row(&json!({})), RowOutcome::Malformed(_)));
        assert!(matches!(
            parse_import_row(&json!({ "Tipo": "", "Etiquetas": null })),
            RowOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_consumable_from_str() {
        assert_eq!("labels".parse::<Consumable>().unwrap(), Consumable::Labels);
        assert_eq!("Etiquetas".parse::<Consumable>().unwrap(), Consumable::Labels);
        assert_eq!("RIBBONS".parse::<Consumable>().unwrap(), Consumable::Ribbons);
        assert!("toner".parse::<Consumable>().is_err());
    }
}
