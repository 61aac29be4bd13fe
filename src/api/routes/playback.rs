//! Playback control endpoints.
//!
//! Provides HTTP endpoints for:
//! - Toggling playback (POST /toggle)
//! - Setting volume (POST /volume)
//! - Toggling auto-start / auto-stop (POST /auto-start, POST /auto-stop)
//! - Getting playback status (GET /status)

use crate::api::error::{ApiError, ApiResult};
use crate::monitor::{ConditionFlag, RoleEdge, RoleState};
use crate::playback::{PlaybackError, PlaybackState};
use crate::policy::Policy;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

/// Commands forwarded from the API to the service dispatch loop. Each carries
/// a reply channel for its outcome.
pub enum ApiCommand {
    Toggle {
        reply: oneshot::Sender<PlaybackState>,
    },
    SetVolume {
        value: String,
        reply: oneshot::Sender<Result<f32, PlaybackError>>,
    },
    ToggleAutoStart {
        reply: oneshot::Sender<bool>,
    },
    ToggleAutoStop {
        reply: oneshot::Sender<bool>,
    },
    SetStreamUrl {
        url: String,
        reply: oneshot::Sender<Result<(), PlaybackError>>,
    },
    Condition {
        flag: ConditionFlag,
        value: bool,
        reply: oneshot::Sender<Option<RoleEdge>>,
    },
    Status {
        reply: oneshot::Sender<ServiceStatus>,
    },
}

/// Everything a status display needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub state: PlaybackState,
    pub policy: Policy,
    pub roles: RoleState,
    pub last_error: Option<String>,
    pub playing_since: Option<DateTime<Utc>>,
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRequest {
    /// Percentage as typed by the user, e.g. "55".
    pub value: String,
}

#[derive(Clone)]
pub struct ApiState {
    pub tx: mpsc::Sender<ApiCommand>,
}

impl ApiState {
    pub fn new(tx: mpsc::Sender<ApiCommand>) -> Self {
        Self { tx }
    }

    /// Send a command to the dispatch loop and wait for its reply.
    pub async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ApiCommand,
    ) -> ApiResult<T> {
        let (reply, rx) = oneshot::channel();
        if let Err(e) = self.tx.send(build(reply)).await {
            error!("Failed to send command to playback service: {}", e);
            return Err(ApiError::unavailable("playback service is not running"));
        }
        rx.await
            .map_err(|_| ApiError::unavailable("playback service dropped the request"))
    }
}

/// Creates the playback router with all playback-related endpoints.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/toggle", post(toggle_playback))
        .route("/volume", post(set_volume))
        .route("/auto-start", post(toggle_auto_start))
        .route("/auto-stop", post(toggle_auto_stop))
        .route("/status", get(playback_status))
        .with_state(state)
}

async fn toggle_playback(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    info!("Toggle playback command received via API");
    let playback = state
        .request(|reply| ApiCommand::Toggle { reply })
        .await?;

    let message = match playback {
        PlaybackState::Playing => "Radio playback started.",
        PlaybackState::Stopped => "Radio playback stopped.",
    };

    Ok(Json(json!({
        "success": true,
        "state": playback.as_str(),
        "message": message,
    })))
}

async fn set_volume(
    State(state): State<ApiState>,
    Json(body): Json<VolumeRequest>,
) -> ApiResult<Json<Value>> {
    let value = body.value;
    let volume = state
        .request(|reply| ApiCommand::SetVolume { value, reply })
        .await??;

    let percent = (volume * 100.0).round() as u32;
    Ok(Json(json!({
        "success": true,
        "volume": volume,
        "percent": percent,
        "message": format!("Radio volume set to {percent}%."),
    })))
}

async fn toggle_auto_start(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let enabled = state
        .request(|reply| ApiCommand::ToggleAutoStart { reply })
        .await?;

    Ok(Json(json!({
        "success": true,
        "auto_start": enabled,
        "message": format!("Auto-start on mount is now {}.", if enabled { "enabled" } else { "disabled" }),
    })))
}

async fn toggle_auto_stop(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let enabled = state
        .request(|reply| ApiCommand::ToggleAutoStop { reply })
        .await?;

    Ok(Json(json!({
        "success": true,
        "auto_stop": enabled,
        "message": format!("Auto-stop on dismount is now {}.", if enabled { "enabled" } else { "disabled" }),
    })))
}

async fn playback_status(State(state): State<ApiState>) -> ApiResult<Json<ServiceStatus>> {
    let status = state
        .request(|reply| ApiCommand::Status { reply })
        .await?;
    Ok(Json(status))
}
