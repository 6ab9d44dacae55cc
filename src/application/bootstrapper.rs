//! Application bootstrapper
//!
//! Handles all initialization and setup for the printdesk server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CONFIG;
use crate::db;
use crate::endpoints;
use crate::services::accounts::ensure_admin_account;
use crate::services::monitor::{NetworkMonitor, ProbeSettings, SystemProber};
use crate::services::scheduler;
use crate::state::AppState;

/// Bootstrap and run the application
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting printdesk v{}", env!("CARGO_PKG_VERSION"));

    let state = init_services().await?;
    let app = create_app(state);

    serve(app).await
}

/// Initialize tracing/logging
fn init_tracing() {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("printdesk={},tower_http=info", CONFIG.log_level).into()
        }),
    );

    if CONFIG.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(false))
            .init();
    }
}

/// Initialize all application services
async fn init_services() -> anyhow::Result<AppState> {
    let conn = db::connect().await?;
    tracing::info!("Database connection established");

    ensure_admin_account(&conn).await?;

    let monitor = NetworkMonitor::start(
        conn.clone(),
        Arc::new(SystemProber),
        ProbeSettings::from(&CONFIG.monitor),
    );
    tracing::info!(
        interval_secs = CONFIG.monitor.sweep_interval_secs,
        timeout_ms = CONFIG.monitor.probe_timeout_ms,
        unstable_ms = CONFIG.monitor.unstable_threshold_ms,
        "Reachability monitor ready"
    );

    // Start periodic task scheduler
    scheduler::start_scheduler(Arc::new(conn.clone()), monitor.clone());

    Ok(AppState::new(conn, monitor))
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = CONFIG
        .server
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let static_dir = &CONFIG.server.static_dir;

    // SPA routing: unknown paths get index.html
    let static_service =
        ServeDir::new(static_dir).not_found_service(ServeFile::new(static_dir.join("index.html")));

    endpoints::create_router(state)
        .fallback_service(static_service)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Start the HTTP server
async fn serve(app: Router) -> anyhow::Result<()> {
    let ip: std::net::IpAddr = CONFIG.server.host.parse()?;
    let addr = SocketAddr::new(ip, CONFIG.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
