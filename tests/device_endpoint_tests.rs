//! Device registry and event log endpoint tests

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::{json, Value};

mod common;
use common::{app_with_user, create_test_db, send};

use printdesk::models::device_event;
use printdesk::models::prelude::*;

async fn create_device(app: &axum::Router, auth: &str, body: Value) -> Value {
    let (status, created) = send(app, "POST", "/api/devices", Some(auth), Some(body)).await;
    assert_eq!(status, 201, "create failed: {}", created);
    created
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_device_with_address_starts_pending() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    let created = create_device(
        &app,
        &auth,
        json!({
            "model": "Zebra ZT411",
            "address": " 10.0.0.21 ",
            "serial": "ZT-0001",
            "status": "In use",
            "location": "Dock 3"
        }),
    )
    .await;

    assert_eq!(created["reachability"], "Pending");
    assert_eq!(created["address"], "10.0.0.21");
    assert_eq!(created["location"], "Dock 3");
}

#[tokio::test]
async fn test_create_device_without_address_is_available() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    let created = create_device(
        &app,
        &auth,
        json!({ "model": "Spare ZD220", "address": "   ", "serial": "" }),
    )
    .await;

    assert_eq!(created["reachability"], "Available");
    assert!(created["address"].is_null());
    assert!(created["serial"].is_null());
}

#[tokio::test]
async fn test_duplicate_address_is_conflict() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db.clone()).await;

    create_device(&app, &auth, json!({ "model": "A", "address": "10.0.0.5" })).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/devices",
        Some(&auth),
        Some(json!({ "model": "B", "address": "10.0.0.5" })),
    )
    .await;

    assert_eq!(status, 409);
    assert!(body["detail"].as_str().unwrap().contains("10.0.0.5"));
    assert_eq!(Device::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_serial_is_conflict() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    create_device(&app, &auth, json!({ "model": "A", "serial": "SN-1" })).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/devices",
        Some(&auth),
        Some(json!({ "model": "B", "serial": "SN-1" })),
    )
    .await;

    assert_eq!(status, 409);
}

#[tokio::test]
async fn test_several_devices_without_address_are_allowed() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    create_device(&app, &auth, json!({ "model": "Spare 1" })).await;
    create_device(&app, &auth, json!({ "model": "Spare 2", "address": "" })).await;
}

#[tokio::test]
async fn test_create_device_requires_model() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/devices",
        Some(&auth),
        Some(json!({ "model": "", "address": "10.0.0.9" })),
    )
    .await;

    assert_eq!(status, 400);
}

// ============================================================================
// Read, search, summary
// ============================================================================

#[tokio::test]
async fn test_get_unknown_device_is_not_found() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    let (status, _) = send(&app, "GET", "/api/devices/999", Some(&auth), None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_search_matches_model_address_serial_and_location() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    create_device(
        &app,
        &auth,
        json!({ "model": "Zebra ZT411", "address": "10.0.0.1", "location": "Expedição" }),
    )
    .await;
    create_device(
        &app,
        &auth,
        json!({ "model": "Honeywell PM45", "serial": "HW-777", "location": "Receiving" }),
    )
    .await;

    let (_, all) = send(&app, "GET", "/api/devices", Some(&auth), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, by_model) = send(&app, "GET", "/api/devices?q=zebra", Some(&auth), None).await;
    assert_eq!(by_model.as_array().unwrap().len(), 1);
    assert_eq!(by_model[0]["model"], "Zebra ZT411");

    let (_, by_serial) = send(&app, "GET", "/api/devices?q=HW-7", Some(&auth), None).await;
    assert_eq!(by_serial[0]["model"], "Honeywell PM45");

    let (_, by_address) = send(&app, "GET", "/api/devices?q=10.0.0", Some(&auth), None).await;
    assert_eq!(by_address.as_array().unwrap().len(), 1);

    let (_, none) = send(&app, "GET", "/api/devices?q=toner", Some(&auth), None).await;
    assert!(none.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_summary_counts_statuses() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    create_device(&app, &auth, json!({ "model": "A", "address": "10.0.0.1" })).await;
    create_device(&app, &auth, json!({ "model": "B" })).await;
    create_device(&app, &auth, json!({ "model": "C" })).await;

    let (status, summary) = send(&app, "GET", "/api/devices/summary", Some(&auth), None).await;

    assert_eq!(status, 200);
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["available"], 2);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_readdressing_resets_to_pending_and_clearing_makes_available() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    let created = create_device(&app, &auth, json!({ "model": "Spare" })).await;
    let uri = format!("/api/devices/{}", created["id"]);

    let (status, updated) = send(
        &app,
        "PUT",
        &uri,
        Some(&auth),
        Some(json!({ "address": "10.0.0.44" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(updated["reachability"], "Pending");
    assert_eq!(updated["model"], "Spare");

    let (_, cleared) = send(&app, "PUT", &uri, Some(&auth), Some(json!({ "address": "" }))).await;
    assert_eq!(cleared["reachability"], "Available");
    assert!(cleared["address"].is_null());
}

#[tokio::test]
async fn test_update_without_address_change_keeps_reachability() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    let created = create_device(&app, &auth, json!({ "model": "Spare" })).await;
    let uri = format!("/api/devices/{}", created["id"]);

    let (_, updated) = send(
        &app,
        "PUT",
        &uri,
        Some(&auth),
        Some(json!({ "status": "Maintenance", "observation": "Head replaced" })),
    )
    .await;

    assert_eq!(updated["reachability"], "Available");
    assert_eq!(updated["status"], "Maintenance");
    assert_eq!(updated["observation"], "Head replaced");
}

#[tokio::test]
async fn test_update_to_taken_address_is_conflict() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    create_device(&app, &auth, json!({ "model": "A", "address": "10.0.0.1" })).await;
    let b = create_device(&app, &auth, json!({ "model": "B", "address": "10.0.0.2" })).await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/devices/{}", b["id"]),
        Some(&auth),
        Some(json!({ "address": "10.0.0.1" })),
    )
    .await;
    assert_eq!(status, 409);

    let (_, unchanged) = send(&app, "GET", &format!("/api/devices/{}", b["id"]), Some(&auth), None).await;
    assert_eq!(unchanged["address"], "10.0.0.2");
}

#[tokio::test]
async fn test_update_keeping_own_address_is_allowed() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    let a = create_device(&app, &auth, json!({ "model": "A", "address": "10.0.0.1" })).await;
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/devices/{}", a["id"]),
        Some(&auth),
        Some(json!({ "address": "10.0.0.1", "model": "A2" })),
    )
    .await;

    assert_eq!(status, 200);
}

// ============================================================================
// Delete and events
// ============================================================================

#[tokio::test]
async fn test_delete_device_removes_its_events() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db.clone()).await;

    let keep = create_device(&app, &auth, json!({ "model": "Keep" })).await;
    let gone = create_device(&app, &auth, json!({ "model": "Gone" })).await;

    for (device, text) in [(&keep, "kept"), (&gone, "first"), (&gone, "second")] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/devices/{}/events", device["id"]),
            Some(&auth),
            Some(json!({ "description": text })),
        )
        .await;
        assert_eq!(status, 201);
    }

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/devices/{}", gone["id"]),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(status, 204);

    let gone_id = gone["id"].as_i64().unwrap();
    let orphaned = DeviceEvent::find()
        .filter(device_event::Column::DeviceId.eq(gone_id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(orphaned, 0);
    assert_eq!(DeviceEvent::find().count(&db).await.unwrap(), 1);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/devices/{}", gone["id"]),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_events_are_listed_newest_first_with_default_date() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    let device = create_device(&app, &auth, json!({ "model": "ZT411" })).await;
    let uri = format!("/api/devices/{}/events", device["id"]);

    send(&app, "POST", &uri, Some(&auth), Some(json!({ "description": "Ribbon jam" }))).await;
    send(
        &app,
        "POST",
        &uri,
        Some(&auth),
        Some(json!({ "description": "Head cleaned", "date": "02/10/2026 09:15:00" })),
    )
    .await;

    let (status, events) = send(&app, "GET", &uri, Some(&auth), None).await;
    assert_eq!(status, 200);

    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["description"], "Head cleaned");
    assert_eq!(events[0]["date"], "02/10/2026 09:15:00");

    // dd/mm/YYYY HH:MM:SS
    let generated = events[1]["date"].as_str().unwrap();
    assert_eq!(generated.len(), 19);
    assert_eq!(&generated[2..3], "/");
    assert_eq!(&generated[5..6], "/");
    assert_eq!(&generated[10..11], " ");
}

#[tokio::test]
async fn test_event_for_unknown_device_is_not_found() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/devices/42/events",
        Some(&auth),
        Some(json!({ "description": "nothing" })),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_edit_and_delete_event() {
    let db = create_test_db().await;
    let (app, auth) = app_with_user(db).await;

    let device = create_device(&app, &auth, json!({ "model": "ZT411" })).await;
    let (_, event) = send(
        &app,
        "POST",
        &format!("/api/devices/{}/events", device["id"]),
        Some(&auth),
        Some(json!({ "description": "Typo" })),
    )
    .await;
    let uri = format!("/api/events/{}", event["id"]);

    let (status, edited) = send(
        &app,
        "PUT",
        &uri,
        Some(&auth),
        Some(json!({ "description": "Label sensor recalibrated" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(edited["description"], "Label sensor recalibrated");
    assert_eq!(edited["date"], event["date"]);

    let (status, _) = send(&app, "DELETE", &uri, Some(&auth), None).await;
    assert_eq!(status, 204);

    let (status, _) = send(&app, "PUT", &uri, Some(&auth), Some(json!({ "description": "x" }))).await;
    assert_eq!(status, 404);
}
