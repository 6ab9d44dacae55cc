use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use validator::Validate;

use crate::error::Result;
use crate::schemas::{
    ImportRequest, MovementListParams, MovementPage, MovementResponse, RecordMovement,
    SetThreshold, StockOverview, ThresholdResponse,
};
use crate::services::ledger::{self, Balance, Consumable, ImportReport, MovementPatch};
use crate::state::AppState;

const RECENT_MOVEMENTS: u64 = 20;
const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 500;

/// Create stock routes
pub fn stock_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(stock_overview))
        .route("/balance/{consumable}", get(get_balance))
        .route("/movements", get(list_movements).post(record_movement))
        .route(
            "/movements/{movement_id}",
            put(update_movement).delete(delete_movement),
        )
        .route("/import", post(import_movements))
        .route("/thresholds", get(list_thresholds))
        .route("/thresholds/{consumable}", put(set_threshold))
        .with_state(state)
}

/// Balances of both consumables plus the latest movements
async fn stock_overview(State(state): State<AppState>) -> Result<Json<StockOverview>> {
    let balances = ledger::all_balances(&state.db).await?;
    let (recent, _) = ledger::list_movements(&state.db, RECENT_MOVEMENTS, 0).await?;

    Ok(Json(StockOverview {
        balances,
        recent: recent.into_iter().map(MovementResponse::from).collect(),
    }))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(consumable): Path<String>,
) -> Result<Json<Balance>> {
    let consumable: Consumable = consumable.parse()?;
    Ok(Json(ledger::current_balance(&state.db, consumable).await?))
}

async fn list_movements(
    State(state): State<AppState>,
    Query(params): Query<MovementListParams>,
) -> Result<Json<MovementPage>> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let (rows, total) = ledger::list_movements(&state.db, limit, skip).await?;

    Ok(Json(MovementPage {
        items: rows.into_iter().map(MovementResponse::from).collect(),
        total,
        skip,
        limit,
    }))
}

async fn record_movement(
    State(state): State<AppState>,
    Json(request): Json<RecordMovement>,
) -> Result<(StatusCode, Json<MovementResponse>)> {
    request.validate()?;

    let created = ledger::record_movement(&state.db, request.into_movement()).await?;
    tracing::info!(
        movement_id = created.id,
        kind = %created.kind,
        "Stock movement recorded"
    );

    Ok((StatusCode::CREATED, Json(MovementResponse::from(created))))
}

async fn update_movement(
    State(state): State<AppState>,
    Path(movement_id): Path<i64>,
    Json(patch): Json<MovementPatch>,
) -> Result<Json<MovementResponse>> {
    let updated = ledger::update_movement(&state.db, movement_id, patch).await?;
    tracing::info!(movement_id, "Stock movement corrected");
    Ok(Json(MovementResponse::from(updated)))
}

async fn delete_movement(
    State(state): State<AppState>,
    Path(movement_id): Path<i64>,
) -> Result<StatusCode> {
    ledger::delete_movement(&state.db, movement_id).await?;
    tracing::info!(movement_id, "Stock movement deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn import_movements(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<ImportReport>> {
    let report = ledger::import_batch(&state.db, request.rows()).await?;
    Ok(Json(report))
}

async fn list_thresholds(State(state): State<AppState>) -> Result<Json<Vec<ThresholdResponse>>> {
    let thresholds = ledger::list_thresholds(&state.db).await?;
    Ok(Json(
        thresholds.into_iter().map(ThresholdResponse::from).collect(),
    ))
}

async fn set_threshold(
    State(state): State<AppState>,
    Path(consumable): Path<String>,
    Json(request): Json<SetThreshold>,
) -> Result<Json<ThresholdResponse>> {
    request.validate()?;
    let consumable: Consumable = consumable.parse()?;

    let saved = ledger::set_threshold(&state.db, consumable, request.minimum).await?;
    tracing::info!(consumable = %consumable, minimum = saved.minimum, "Stock threshold updated");

    Ok(Json(ThresholdResponse::from(saved)))
}
