use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::put,
    Json, Router,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::device_event;
use crate::models::prelude::*;
use crate::schemas::{EventResponse, UpdateEvent};
use crate::state::AppState;

/// Create event routes (creation lives under the owning device)
pub fn events_routes(state: AppState) -> Router {
    Router::new()
        .route("/{event_id}", put(update_event).delete(delete_event))
        .with_state(state)
}

async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Json(request): Json<UpdateEvent>,
) -> Result<Json<EventResponse>> {
    request.validate()?;

    let existing = DeviceEvent::find_by_id(event_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

    let mut active: device_event::ActiveModel = existing.into();
    if let Some(date) = request.date {
        active.date = Set(date.trim().to_string());
    }
    if let Some(description) = request.description {
        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(AppError::BadRequest("Description is required".to_string()));
        }
        active.description = Set(description);
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(EventResponse::from(updated)))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<StatusCode> {
    let result = DeviceEvent::delete_by_id(event_id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Event {} not found", event_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
