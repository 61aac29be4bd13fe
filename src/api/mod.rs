//! REST API server for Mount Radio.
//!
//! Provides HTTP endpoints for:
//! - Playback control (toggle, volume, auto-start, auto-stop, status)
//! - Settings (stream URL)
//! - The host condition feed (mount / dismount)

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::info;

pub use routes::condition::ConditionUpdate;
pub use routes::playback::{ApiCommand, ApiState, ServiceStatus, VolumeRequest};
pub use routes::settings::{SettingsUpdate, SettingsView};

pub struct ApiServer {
    port: u16,
    state: ApiState,
}

impl ApiServer {
    pub fn new(tx: tokio::sync::mpsc::Sender<ApiCommand>, port: u16) -> Self {
        Self {
            port,
            state: ApiState::new(tx),
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /              - Service info");
        info!("  GET  /status        - Playback status");
        info!("  POST /toggle        - Toggle playback");
        info!("  POST /volume        - Set volume (0-100)");
        info!("  POST /auto-start    - Toggle auto-start on mount");
        info!("  POST /auto-stop     - Toggle auto-stop on dismount");
        info!("  GET  /settings      - Show settings");
        info!("  PUT  /settings      - Update stream URL");
        info!("  POST /condition     - Report a host condition flag");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the full application router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/version", get(version))
        .merge(routes::playback::router(state.clone()))
        .merge(routes::condition::router(state.clone()))
        .nest("/settings", routes::settings::router(state))
        .layer(ServiceBuilder::new())
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "mountradio",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "mountradio"
    }))
}
