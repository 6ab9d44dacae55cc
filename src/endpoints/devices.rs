use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use validator::Validate;

use crate::error::{conflict_on_unique, AppError, Result};
use crate::models::device::{self, Reachability};
use crate::models::device_event;
use crate::models::prelude::*;
use crate::schemas::{
    CreateDevice, CreateEvent, DeviceListParams, DeviceResponse, EventResponse,
    ReachabilitySummary, UpdateDevice,
};
use crate::services::ledger::now_display;
use crate::state::{AppState, DbConn};

/// Create device routes
pub fn devices_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_devices).post(create_device))
        .route("/summary", get(reachability_summary))
        .route(
            "/{device_id}",
            get(get_device).put(update_device).delete(delete_device),
        )
        .route("/{device_id}/events", get(list_events).post(create_event))
        .with_state(state)
}

/// Trim, and treat blank as absent
fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn find_device(db: &DbConn, device_id: i64) -> Result<device::Model> {
    Device::find_by_id(device_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device {} not found", device_id)))
}

/// Reject an address or serial already held by another device
async fn ensure_unique(
    db: &DbConn,
    address: Option<&str>,
    serial: Option<&str>,
    exclude_id: Option<i64>,
) -> Result<()> {
    let others = |query: sea_orm::Select<Device>| match exclude_id {
        Some(id) => query.filter(device::Column::Id.ne(id)),
        None => query,
    };

    if let Some(address) = address {
        let taken = others(Device::find().filter(device::Column::Address.eq(address)))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict(format!(
                "Address {} is already registered",
                address
            )));
        }
    }

    if let Some(serial) = serial {
        let taken = others(Device::find().filter(device::Column::Serial.eq(serial)))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict(format!(
                "Serial {} is already registered",
                serial
            )));
        }
    }

    Ok(())
}

/// List devices, optionally filtered by a search term
async fn list_devices(
    State(state): State<AppState>,
    Query(params): Query<DeviceListParams>,
) -> Result<Json<Vec<DeviceResponse>>> {
    let mut query = Device::find();

    if let Some(q) = normalize_optional(params.q) {
        query = query.filter(
            Condition::any()
                .add(device::Column::Model.contains(&q))
                .add(device::Column::Address.contains(&q))
                .add(device::Column::Serial.contains(&q))
                .add(device::Column::Location.contains(&q)),
        );
    }

    let devices = query
        .order_by_asc(device::Column::Model)
        .order_by_asc(device::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(devices.into_iter().map(DeviceResponse::from).collect()))
}

async fn reachability_summary(State(state): State<AppState>) -> Result<Json<ReachabilitySummary>> {
    let devices = Device::find().all(&state.db).await?;

    let mut summary = ReachabilitySummary::default();
    for d in &devices {
        summary.add(&d.reachability);
    }

    Ok(Json(summary))
}

async fn get_device(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> Result<Json<DeviceResponse>> {
    let found = find_device(&state.db, device_id).await?;
    Ok(Json(DeviceResponse::from(found)))
}

async fn create_device(
    State(state): State<AppState>,
    Json(request): Json<CreateDevice>,
) -> Result<(StatusCode, Json<DeviceResponse>)> {
    request.validate()?;

    let address = normalize_optional(request.address);
    let serial = normalize_optional(request.serial);
    ensure_unique(&state.db, address.as_deref(), serial.as_deref(), None).await?;

    let now = Utc::now();
    let reachability = Reachability::initial_for(address.as_deref());

    let created = device::ActiveModel {
        model: Set(request.model.trim().to_string()),
        address: Set(address.clone()),
        serial: Set(serial),
        status: Set(request.status.trim().to_string()),
        location: Set(request.location.trim().to_string()),
        reachability: Set(reachability.as_str().to_string()),
        observation: Set(normalize_optional(request.observation)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| conflict_on_unique(e, "Address or serial is already registered"))?;

    tracing::info!(device_id = created.id, model = %created.model, "Device registered");

    if address.is_some() {
        state.monitor.request_sweep();
    }

    Ok((StatusCode::CREATED, Json(DeviceResponse::from(created))))
}

async fn update_device(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
    Json(request): Json<UpdateDevice>,
) -> Result<Json<DeviceResponse>> {
    request.validate()?;

    let existing = find_device(&state.db, device_id).await?;

    let address = match request.address {
        Some(a) => normalize_optional(Some(a)),
        None => existing.address.clone(),
    };
    let serial = match request.serial {
        Some(s) => normalize_optional(Some(s)),
        None => existing.serial.clone(),
    };
    ensure_unique(
        &state.db,
        address.as_deref(),
        serial.as_deref(),
        Some(device_id),
    )
    .await?;

    let readdressed = address != existing.address;

    let mut active: device::ActiveModel = existing.into();
    if let Some(model) = request.model {
        active.model = Set(model.trim().to_string());
    }
    if let Some(status) = request.status {
        active.status = Set(status.trim().to_string());
    }
    if let Some(location) = request.location {
        active.location = Set(location.trim().to_string());
    }
    if let Some(observation) = request.observation {
        active.observation = Set(normalize_optional(Some(observation)));
    }
    if readdressed {
        let reachability = Reachability::initial_for(address.as_deref());
        active.reachability = Set(reachability.as_str().to_string());
    }
    active.address = Set(address.clone());
    active.serial = Set(serial);
    active.updated_at = Set(Utc::now());

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| conflict_on_unique(e, "Address or serial is already registered"))?;

    tracing::info!(device_id, readdressed, "Device updated");

    if address.is_some() {
        state.monitor.request_sweep();
    }

    Ok(Json(DeviceResponse::from(updated)))
}

/// Delete a device together with its event log
async fn delete_device(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> Result<StatusCode> {
    let txn = state.db.begin().await?;

    let events = DeviceEvent::delete_many()
        .filter(device_event::Column::DeviceId.eq(device_id))
        .exec(&txn)
        .await?;

    let result = Device::delete_by_id(device_id).exec(&txn).await?;
    if result.rows_affected == 0 {
        txn.rollback().await?;
        return Err(AppError::NotFound(format!("Device {} not found", device_id)));
    }

    txn.commit().await?;

    tracing::info!(
        device_id,
        events_removed = events.rows_affected,
        "Device deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Events of one device, newest first
async fn list_events(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> Result<Json<Vec<EventResponse>>> {
    find_device(&state.db, device_id).await?;

    let events = DeviceEvent::find()
        .filter(device_event::Column::DeviceId.eq(device_id))
        .order_by_desc(device_event::Column::CreatedAt)
        .order_by_desc(device_event::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

async fn create_event(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
    Json(request): Json<CreateEvent>,
) -> Result<(StatusCode, Json<EventResponse>)> {
    request.validate()?;
    find_device(&state.db, device_id).await?;

    let description = request.description.trim().to_string();
    if description.is_empty() {
        return Err(AppError::BadRequest("Description is required".to_string()));
    }

    let event = device_event::ActiveModel {
        device_id: Set(device_id),
        date: Set(normalize_optional(request.date).unwrap_or_else(now_display)),
        description: Set(description),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::debug!(device_id, event_id = event.id, "Device event recorded");

    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}
