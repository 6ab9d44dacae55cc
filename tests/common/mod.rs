//! Test helpers shared by the integration tests.
//!
//! Databases are in-memory SQLite migrated with the real `Migrator`; probes
//! go through a scripted prober so no test touches the network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::util::ServiceExt;

use printdesk::endpoints::create_router;
use printdesk::models::user;
use printdesk::services::accounts;
use printdesk::services::monitor::{NetworkMonitor, ProbeSettings, Prober};
use printdesk::services::security::create_access_token;
use printdesk::state::AppState;

/// Create an in-memory SQLite database for testing
pub async fn create_test_db() -> DatabaseConnection {
    printdesk::db::connect_with_url("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

/// Create a test account and return the user model
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> user::Model {
    accounts::create_user(db, username, password).await.unwrap()
}

/// `Authorization` header value for a user
pub fn bearer(user: &user::Model) -> String {
    let token = create_access_token(user.id, &user.username).unwrap();
    format!("Bearer {}", token)
}

/// What the scripted prober answers for one address
#[derive(Clone, Copy, Debug)]
pub enum Scripted {
    Reply(Duration),
    Silent,
    Fail,
}

/// Prober answering from a fixed table. Unknown addresses stay silent.
#[derive(Default)]
pub struct ScriptedProber {
    replies: HashMap<String, Scripted>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, address: &str, millis: u64) -> Self {
        self.replies
            .insert(address.to_string(), Scripted::Reply(Duration::from_millis(millis)));
        self
    }

    pub fn silent(mut self, address: &str) -> Self {
        self.replies.insert(address.to_string(), Scripted::Silent);
        self
    }

    pub fn fail(mut self, address: &str) -> Self {
        self.replies.insert(address.to_string(), Scripted::Fail);
        self
    }

    /// Addresses probed so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &str, _timeout: Duration) -> anyhow::Result<Option<Duration>> {
        self.calls.lock().push(address.to_string());
        match self.replies.get(address) {
            Some(Scripted::Reply(rtt)) => Ok(Some(*rtt)),
            Some(Scripted::Fail) => anyhow::bail!("scripted probe failure for {}", address),
            Some(Scripted::Silent) | None => Ok(None),
        }
    }
}

/// App state whose monitor uses the given prober
pub fn build_app_state_with_prober(db: DatabaseConnection, prober: Arc<ScriptedProber>) -> AppState {
    let monitor = NetworkMonitor::start(db.clone(), prober, ProbeSettings::default());
    AppState::new(db, monitor)
}

/// App state whose monitor sees every device as silent
pub fn build_app_state(db: DatabaseConnection) -> AppState {
    build_app_state_with_prober(db, Arc::new(ScriptedProber::new()))
}

/// Router plus a logged-in operator's auth header
pub async fn app_with_user(db: DatabaseConnection) -> (Router, String) {
    let user = create_test_user(&db, "operator", "s3cret-pass").await;
    let app = create_router(build_app_state(db));
    (app, bearer(&user))
}

/// Send a request and decode the JSON body (`Value::Null` when empty)
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("Authorization", auth);
    }

    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json)
}
